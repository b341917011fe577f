//! File loaders for spend records: flat CSV samples and the partitioned
//! parquet layer.

use crate::error::Result;
use crate::io::frame::{records_from_frame, ColumnMapping};
use crate::model::RawSpendRecord;
use polars::prelude::*;
use std::path::Path;
use tracing::info;

/// Load spend records from a CSV file.
pub fn load_csv(path: &Path, mapping: &ColumnMapping) -> Result<Vec<RawSpendRecord>> {
    let columns: Vec<Expr> = mapping.columns().iter().map(|c| col(c)).collect();

    let df = LazyCsvReader::new(path)
        .with_try_parse_dates(true)
        .with_infer_schema_length(Some(1000))
        .finish()?
        .select(columns)
        .collect()?;

    let records = records_from_frame(&df, mapping)?;
    info!("Loaded {} spend record(s) from {}", records.len(), path.display());
    Ok(records)
}

/// Load spend records from a partitioned parquet layer.
///
/// `pattern` may be a single file or a glob over partition directories, e.g.
/// `data/silver/contracts/version=v0.3.0/*/data.parquet`.
pub fn load_partitioned_parquet(
    pattern: &str,
    mapping: &ColumnMapping,
) -> Result<Vec<RawSpendRecord>> {
    let columns: Vec<Expr> = mapping.columns().iter().map(|c| col(c)).collect();

    let df = LazyFrame::scan_parquet(pattern, ScanArgsParquet::default())?
        .select(columns)
        .collect()?;

    let records = records_from_frame(&df, mapping)?;
    info!("Loaded {} spend record(s) from {}", records.len(), pattern);
    Ok(records)
}
