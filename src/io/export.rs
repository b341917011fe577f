//! Report export. Numeric fields go out verbatim; formatting (currency,
//! percentages) is left to whatever consumes the CSV.

use crate::error::Result;
use crate::model::ConcentrationReport;
use polars::prelude::*;
use std::path::Path;
use tracing::info;

/// Flatten a report into a DataFrame, one row per group, in report order.
pub fn report_to_frame(report: &ConcentrationReport) -> Result<DataFrame> {
    let organizations: Vec<&str> = report
        .entries
        .iter()
        .map(|e| e.group_key.organization.as_str())
        .collect();
    let fiscal_periods: Vec<Option<&str>> = report
        .entries
        .iter()
        .map(|e| e.group_key.fiscal_period.as_deref())
        .collect();
    let total_spend: Vec<f64> = report.entries.iter().map(|e| e.total_spend).collect();
    let total_records: Vec<i64> = report
        .entries
        .iter()
        .map(|e| e.total_records as i64)
        .collect();
    let hhi: Vec<f64> = report.entries.iter().map(|e| e.hhi).collect();
    let top_n_share: Vec<f64> = report.entries.iter().map(|e| e.top_n_share).collect();
    let unique_vendors: Vec<i64> = report
        .entries
        .iter()
        .map(|e| e.unique_vendors as i64)
        .collect();
    let vendors_over_threshold: Vec<i64> = report
        .entries
        .iter()
        .map(|e| e.vendors_over_threshold as i64)
        .collect();
    let concentration_level: Vec<&str> = report
        .entries
        .iter()
        .map(|e| e.concentration_level.as_str())
        .collect();

    let df = df! [
        "organization" => organizations,
        "fiscal_period" => fiscal_periods,
        "total_spend" => total_spend,
        "total_records" => total_records,
        "hhi" => hhi,
        "top_n_share" => top_n_share,
        "unique_vendors" => unique_vendors,
        "vendors_over_threshold" => vendors_over_threshold,
        "concentration_level" => concentration_level
    ]?;
    Ok(df)
}

/// Write the report to a CSV file.
pub fn write_report_csv(report: &ConcentrationReport, path: &Path) -> Result<()> {
    let mut df = report_to_frame(report)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = std::fs::File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)?;

    info!(
        "Wrote {} report row(s) to {}",
        report.entries.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::FilterStats;
    use crate::model::{ConcentrationEntry, ConcentrationLevel, GroupKey};

    #[test]
    fn frame_preserves_report_order_and_levels() {
        let report = ConcentrationReport {
            entries: vec![
                ConcentrationEntry {
                    group_key: GroupKey::organization_period("DOT", "2023"),
                    total_spend: 1000.0,
                    total_records: 6,
                    hhi: 0.46,
                    top_n_share: 1.0,
                    unique_vendors: 3,
                    vendors_over_threshold: 3,
                    concentration_level: ConcentrationLevel::HighlyConcentrated,
                },
                ConcentrationEntry {
                    group_key: GroupKey::organization("HHS"),
                    total_spend: 500.0,
                    total_records: 10,
                    hhi: 0.12,
                    top_n_share: 0.8,
                    unique_vendors: 12,
                    vendors_over_threshold: 1,
                    concentration_level: ConcentrationLevel::Competitive,
                },
            ],
            filter_stats: FilterStats::default(),
        };

        let df = report_to_frame(&report).unwrap();
        assert_eq!(df.height(), 2);
        let levels = df.column("concentration_level").unwrap();
        assert_eq!(
            levels.get(0).unwrap().to_string().trim_matches('"'),
            "HighlyConcentrated"
        );
        let periods = df.column("fiscal_period").unwrap();
        assert!(matches!(periods.get(1).unwrap(), AnyValue::Null));
        let hhi = df.column("hhi").unwrap();
        assert_eq!(hhi.get(0).unwrap().try_extract::<f64>().unwrap(), 0.46);
    }
}
