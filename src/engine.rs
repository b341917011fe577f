//! The reusable concentration engine: one configured object running the
//! three-stage pipeline, shared by every call site instead of re-deriving
//! the same aggregation per script.

use crate::aggregate::SpendAggregate;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::model::{ConcentrationReport, Grouping, RawSpendRecord};
use crate::report::build_report;
use crate::shares::compute_shares;
use tracing::info;

pub struct ConcentrationEngine {
    config: AnalysisConfig,
    grouping: Grouping,
}

impl ConcentrationEngine {
    /// Create an engine with a validated configuration.
    pub fn new(config: AnalysisConfig, grouping: Grouping) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, grouping })
    }

    pub fn with_defaults(grouping: Grouping) -> Self {
        Self {
            config: AnalysisConfig::default(),
            grouping,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn grouping(&self) -> Grouping {
        self.grouping
    }

    /// Run the full pipeline over a record sequence.
    ///
    /// Pure with respect to the engine: no state survives the call, and the
    /// result is independent of input row order.
    pub fn analyze<I>(&self, records: I) -> Result<ConcentrationReport>
    where
        I: IntoIterator<Item = RawSpendRecord>,
    {
        let mut aggregate = SpendAggregate::new(self.grouping);
        aggregate.add_all(records);
        self.analyze_aggregate(aggregate)
    }

    /// Run the pipeline over pre-built partial aggregates, merging them
    /// first. Produces the same report as a single-pass [`analyze`] over the
    /// concatenated partitions.
    ///
    /// [`analyze`]: ConcentrationEngine::analyze
    pub fn analyze_partitions<I>(&self, partitions: I) -> Result<ConcentrationReport>
    where
        I: IntoIterator<Item = SpendAggregate>,
    {
        let mut merged = SpendAggregate::new(self.grouping);
        for partition in partitions {
            merged.merge(partition)?;
        }
        self.analyze_aggregate(merged)
    }

    /// Stages 2 and 3 over an already-built aggregate.
    pub fn analyze_aggregate(&self, aggregate: SpendAggregate) -> Result<ConcentrationReport> {
        let filter_stats = *aggregate.filter_stats();
        info!(
            "Aggregated {} of {} records ({} dropped by filter policy)",
            filter_stats.records_kept,
            filter_stats.records_seen,
            filter_stats.records_dropped()
        );

        let (vendor_spend, group_totals) = aggregate.eligible(self.config.min_group_records);
        let shares = compute_shares(&vendor_spend, &group_totals);
        let entries = build_report(&shares, &group_totals, &self.config);

        info!(
            "Computed concentration metrics for {} eligible group(s)",
            entries.len()
        );
        Ok(ConcentrationReport {
            entries,
            filter_stats,
        })
    }
}
