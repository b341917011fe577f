//! Data-access collaborators: loading spend rows from flat files or the
//! partitioned parquet layer, and exporting the report. The engine itself
//! never touches a file.

pub mod export;
pub mod frame;
pub mod loader;

pub use export::{report_to_frame, write_report_csv};
pub use frame::{records_from_frame, ColumnMapping};
pub use loader::{load_csv, load_partitioned_parquet};
