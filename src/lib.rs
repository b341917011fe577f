//! Vendor concentration analytics over procurement spend records.
//!
//! The core is a three-stage pipeline: aggregate raw transaction rows into
//! vendor-level spend totals, derive each vendor's market share within its
//! group, then compute the Herfindahl-Hirschman Index and related statistics
//! (top-N share, dominance counts, concentration bands) per group.
//!
//! The pipeline is pure and synchronous; all file access lives in [`io`].

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod model;
pub mod report;
pub mod shares;

pub use config::{AnalysisConfig, ClassificationBands, HhiScale};
pub use engine::ConcentrationEngine;
pub use error::{AnalyticsError, Result};
pub use model::{
    ConcentrationEntry, ConcentrationLevel, ConcentrationReport, GroupKey, Grouping,
    RawSpendRecord,
};
