//! Stage 1: collapse raw transaction rows into vendor-level spend totals.
//!
//! The aggregate is incremental and mergeable: partial aggregates built over
//! partitions of the input combine into the same result as a single pass,
//! which is what makes the stage safe to parallelise over large record sets.

use crate::error::{AnalyticsError, Result};
use crate::model::{GroupKey, GroupTotals, Grouping, RawSpendRecord, SpendRecord, VendorSpend};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Counts of records seen, kept, and dropped per filter reason.
///
/// Dropping is declared policy, not an error, but the counts are surfaced so
/// a caller can notice an unexpectedly high drop rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub records_seen: u64,
    pub records_kept: u64,
    pub missing_vendor: u64,
    pub missing_organization: u64,
    pub missing_period: u64,
    pub non_positive_amount: u64,
}

impl FilterStats {
    pub fn records_dropped(&self) -> u64 {
        self.records_seen - self.records_kept
    }

    fn absorb(&mut self, other: &FilterStats) {
        self.records_seen += other.records_seen;
        self.records_kept += other.records_kept;
        self.missing_vendor += other.missing_vendor;
        self.missing_organization += other.missing_organization;
        self.missing_period += other.missing_period;
        self.non_positive_amount += other.non_positive_amount;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct VendorAccum {
    total_amount: f64,
    record_count: u64,
}

/// Incremental vendor-spend aggregate over one grouping granularity.
///
/// BTreeMap-backed so iteration (and therefore summation order downstream)
/// is deterministic regardless of input order.
#[derive(Debug, Clone)]
pub struct SpendAggregate {
    grouping: Grouping,
    groups: BTreeMap<GroupKey, BTreeMap<String, VendorAccum>>,
    stats: FilterStats,
}

impl SpendAggregate {
    pub fn new(grouping: Grouping) -> Self {
        Self {
            grouping,
            groups: BTreeMap::new(),
            stats: FilterStats::default(),
        }
    }

    pub fn grouping(&self) -> Grouping {
        self.grouping
    }

    pub fn filter_stats(&self) -> &FilterStats {
        &self.stats
    }

    /// Apply the filter policy to one raw row: every identifying field for
    /// the grouping granularity must be present and the amount positive.
    ///
    /// Returns the admitted record, or None after counting the drop reason.
    pub fn admit(&mut self, record: &RawSpendRecord) -> Option<SpendRecord> {
        self.stats.records_seen += 1;

        let vendor_name = match record.vendor_name.as_deref() {
            Some(v) if !v.trim().is_empty() => v.to_string(),
            _ => {
                self.stats.missing_vendor += 1;
                return None;
            }
        };
        let organization = match record.organization.as_deref() {
            Some(o) if !o.trim().is_empty() => o.to_string(),
            _ => {
                self.stats.missing_organization += 1;
                return None;
            }
        };
        let group_key = match self.grouping {
            Grouping::Organization => GroupKey::organization(organization),
            Grouping::OrganizationPeriod => match record.fiscal_period.as_deref() {
                Some(p) if !p.trim().is_empty() => {
                    GroupKey::organization_period(organization, p.to_string())
                }
                _ => {
                    self.stats.missing_period += 1;
                    return None;
                }
            },
        };
        let amount = match record.amount {
            Some(a) if a > 0.0 => a,
            _ => {
                self.stats.non_positive_amount += 1;
                return None;
            }
        };

        self.stats.records_kept += 1;
        Some(SpendRecord {
            group_key,
            vendor_name,
            amount,
        })
    }

    /// Fold one raw row into the aggregate (filter policy included).
    pub fn add(&mut self, record: &RawSpendRecord) {
        if let Some(kept) = self.admit(record) {
            let accum = self
                .groups
                .entry(kept.group_key)
                .or_default()
                .entry(kept.vendor_name)
                .or_default();
            accum.total_amount += kept.amount;
            accum.record_count += 1;
        }
    }

    pub fn add_all<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = RawSpendRecord>,
    {
        for record in records {
            self.add(&record);
        }
    }

    /// Combine a partial aggregate built over another input partition.
    ///
    /// Sums are associative and commutative, so merged partials equal a
    /// single-pass aggregate up to floating-point rounding order.
    pub fn merge(&mut self, other: SpendAggregate) -> Result<()> {
        if other.grouping != self.grouping {
            return Err(AnalyticsError::Data(format!(
                "cannot merge aggregates with different groupings: {:?} vs {:?}",
                self.grouping, other.grouping
            )));
        }
        for (group_key, vendors) in other.groups {
            let target = self.groups.entry(group_key).or_default();
            for (vendor_name, accum) in vendors {
                let slot = target.entry(vendor_name).or_default();
                slot.total_amount += accum.total_amount;
                slot.record_count += accum.record_count;
            }
        }
        self.stats.absorb(&other.stats);
        Ok(())
    }

    /// Vendor-level totals, one entry per distinct (group, vendor) pair.
    pub fn vendor_spend(&self) -> Vec<VendorSpend> {
        self.groups
            .iter()
            .flat_map(|(group_key, vendors)| {
                vendors.iter().map(move |(vendor_name, accum)| VendorSpend {
                    group_key: group_key.clone(),
                    vendor_name: vendor_name.clone(),
                    total_amount: accum.total_amount,
                    record_count: accum.record_count,
                })
            })
            .collect()
    }

    /// Group-level totals, one entry per distinct group key.
    pub fn group_totals(&self) -> Vec<GroupTotals> {
        self.groups
            .iter()
            .map(|(group_key, vendors)| {
                let (total_spend, total_records) = vendors
                    .values()
                    .fold((0.0, 0u64), |(spend, records), accum| {
                        (spend + accum.total_amount, records + accum.record_count)
                    });
                GroupTotals {
                    group_key: group_key.clone(),
                    total_spend,
                    total_records,
                }
            })
            .collect()
    }

    /// Vendor and group totals restricted to groups that meet the minimum
    /// record count. Ineligible groups are dropped here, before share
    /// computation, rather than reported with null metrics.
    pub fn eligible(&self, min_group_records: u64) -> (Vec<VendorSpend>, Vec<GroupTotals>) {
        let totals: Vec<GroupTotals> = self
            .group_totals()
            .into_iter()
            .filter(|t| t.total_records >= min_group_records)
            .collect();

        let dropped = self.groups.len() - totals.len();
        if dropped > 0 {
            debug!(
                "Dropped {} group(s) below the {}-record eligibility threshold",
                dropped, min_group_records
            );
        }
        if self.stats.records_seen > 0 {
            let drop_rate = self.stats.records_dropped() as f64 / self.stats.records_seen as f64;
            if drop_rate > 0.5 {
                warn!(
                    "Filter policy dropped {:.1}% of input records ({} of {})",
                    drop_rate * 100.0,
                    self.stats.records_dropped(),
                    self.stats.records_seen
                );
            }
        }

        let vendors = self
            .vendor_spend()
            .into_iter()
            .filter(|v| totals.iter().any(|t| t.group_key == v.group_key))
            .collect();
        (vendors, totals)
    }
}
