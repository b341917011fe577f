//! Typed records flowing through the concentration pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Granularity over which concentration is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// One group per organization, all fiscal periods pooled.
    #[default]
    Organization,

    /// One group per organization x fiscal period.
    OrganizationPeriod,
}

/// The dimension a group of spend records belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub organization: String,

    /// Present only when grouping by organization x period.
    pub fiscal_period: Option<String>,
}

impl GroupKey {
    pub fn organization(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            fiscal_period: None,
        }
    }

    pub fn organization_period(
        organization: impl Into<String>,
        fiscal_period: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            fiscal_period: Some(fiscal_period.into()),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fiscal_period {
            Some(period) => write!(f, "{} / {}", self.organization, period),
            None => write!(f, "{}", self.organization),
        }
    }
}

/// A spend row as read from the source, before the filter policy is applied.
///
/// Identifying fields are optional because source data carries nulls; the
/// aggregator drops incomplete rows and counts them (see
/// [`crate::aggregate::FilterStats`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSpendRecord {
    pub vendor_name: Option<String>,
    pub organization: Option<String>,
    pub fiscal_period: Option<String>,
    pub amount: Option<f64>,
}

impl RawSpendRecord {
    /// Convenience constructor for a fully-populated record.
    pub fn new(
        vendor_name: impl Into<String>,
        organization: impl Into<String>,
        fiscal_period: Option<String>,
        amount: f64,
    ) -> Self {
        Self {
            vendor_name: Some(vendor_name.into()),
            organization: Some(organization.into()),
            fiscal_period,
            amount: Some(amount),
        }
    }
}

/// A record that passed the filter policy.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendRecord {
    pub group_key: GroupKey,
    pub vendor_name: String,
    pub amount: f64,
}

/// Per-vendor spend totals within a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorSpend {
    pub group_key: GroupKey,
    pub vendor_name: String,
    pub total_amount: f64,
    pub record_count: u64,
}

/// Per-group spend totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotals {
    pub group_key: GroupKey,
    pub total_spend: f64,
    pub total_records: u64,
}

/// A vendor's fractional share of its group's spend, with its dense rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketShare {
    pub group_key: GroupKey,
    pub vendor_name: String,
    pub total_amount: f64,

    /// Fraction of group spend in [0, 1]. Sums to 1.0 per group (within
    /// tolerance), including the uniform fallback for zero-spend groups.
    pub share: f64,

    /// 1-based dense rank by total_amount descending; ties share a rank.
    pub rank: u32,
}

/// Concentration band a group falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcentrationLevel {
    Competitive,
    ModeratelyConcentrated,
    HighlyConcentrated,
}

impl ConcentrationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcentrationLevel::Competitive => "Competitive",
            ConcentrationLevel::ModeratelyConcentrated => "ModeratelyConcentrated",
            ConcentrationLevel::HighlyConcentrated => "HighlyConcentrated",
        }
    }
}

impl fmt::Display for ConcentrationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One report row: concentration metrics for a single eligible group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcentrationEntry {
    pub group_key: GroupKey,
    pub total_spend: f64,
    pub total_records: u64,

    /// Herfindahl-Hirschman Index on the configured scale.
    pub hhi: f64,

    /// Combined share of the top-N vendors, always fractional.
    pub top_n_share: f64,

    pub unique_vendors: u64,

    /// Vendors whose share meets the dominance threshold.
    pub vendors_over_threshold: u64,

    pub concentration_level: ConcentrationLevel,
}

/// Final output of a run: entries sorted by hhi descending, plus the filter
/// diagnostics accumulated while aggregating.
#[derive(Debug, Clone, Serialize)]
pub struct ConcentrationReport {
    pub entries: Vec<ConcentrationEntry>,
    pub filter_stats: crate::aggregate::FilterStats,
}
