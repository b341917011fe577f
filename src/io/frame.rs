//! DataFrame to record conversion.

use crate::error::Result;
use crate::model::RawSpendRecord;
use chrono::Datelike;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Maps source column names onto the record fields the engine needs.
///
/// Defaults follow the procurement contracts dataset this project was built
/// against; other sources override the names that differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub vendor: String,
    pub organization: String,

    /// Period column; None when the source has no period dimension.
    pub fiscal_period: Option<String>,

    pub amount: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            vendor: "vendor_name".to_string(),
            organization: "organization".to_string(),
            fiscal_period: Some("fiscal_year_begin".to_string()),
            amount: "dollars_spent_to_date".to_string(),
        }
    }
}

impl ColumnMapping {
    /// Columns to project when scanning a source.
    pub fn columns(&self) -> Vec<String> {
        let mut cols = vec![
            self.vendor.clone(),
            self.organization.clone(),
            self.amount.clone(),
        ];
        if let Some(period) = &self.fiscal_period {
            cols.push(period.clone());
        }
        cols
    }
}

/// Convert a DataFrame into raw spend records.
///
/// Nulls stay None (the aggregator's filter policy handles them); a missing
/// mapped column is a schema error and fails hard before the engine runs.
pub fn records_from_frame(df: &DataFrame, mapping: &ColumnMapping) -> Result<Vec<RawSpendRecord>> {
    let vendor = df.column(&mapping.vendor)?;
    let organization = df.column(&mapping.organization)?;
    let amount = df.column(&mapping.amount)?;
    let period = match &mapping.fiscal_period {
        Some(name) => Some(df.column(name)?),
        None => None,
    };

    let mut records = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        records.push(RawSpendRecord {
            vendor_name: value_as_string(&vendor.get(row_idx)?),
            organization: value_as_string(&organization.get(row_idx)?),
            fiscal_period: match period {
                Some(series) => value_as_period(&series.get(row_idx)?),
                None => None,
            },
            amount: value_as_amount(&amount.get(row_idx)?),
        });
    }
    Ok(records)
}

fn value_as_string(value: &AnyValue) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => non_empty(s),
        AnyValue::StringOwned(s) => non_empty(s),
        other => non_empty(&other.to_string()),
    }
}

/// Period values arrive as text, integers (plain years) or parsed dates;
/// dates collapse to their calendar year, matching how the source dataset
/// labels fiscal years by their begin date.
fn value_as_period(value: &AnyValue) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => non_empty(s),
        AnyValue::StringOwned(s) => non_empty(s),
        AnyValue::Date(days) => {
            let date = chrono::NaiveDate::from_ymd_opt(1970, 1, 1)?
                .checked_add_signed(chrono::Duration::days(*days as i64))?;
            Some(date.year().to_string())
        }
        AnyValue::Datetime(ts, unit, _) => {
            let seconds = match unit {
                TimeUnit::Nanoseconds => ts / 1_000_000_000,
                TimeUnit::Microseconds => ts / 1_000_000,
                TimeUnit::Milliseconds => ts / 1_000,
            };
            let datetime = chrono::DateTime::from_timestamp(seconds, 0)?;
            Some(datetime.year().to_string())
        }
        other => match other.try_extract::<i64>() {
            Ok(year) => Some(year.to_string()),
            Err(_) => non_empty(&other.to_string()),
        },
    }
}

fn value_as_amount(value: &AnyValue) -> Option<f64> {
    match value {
        AnyValue::Null => None,
        other => other.try_extract::<f64>().ok(),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
