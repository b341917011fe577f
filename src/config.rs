//! Analysis configuration - the injected parameter surface of the engine.
//!
//! Every threshold that governs eligibility, ranking and classification lives
//! here so call sites share a single source of truth instead of re-declaring
//! constants per script.

use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scale on which HHI values (and classification bands) are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HhiScale {
    /// Fractional scale, 0.0 - 1.0. Canonical default.
    #[default]
    Fraction,

    /// Conventional antitrust scale, 0 - 10,000.
    Points,
}

impl HhiScale {
    /// Multiplier applied to a fractional index to express it on this scale.
    pub fn factor(&self) -> f64 {
        match self {
            HhiScale::Fraction => 1.0,
            HhiScale::Points => 10_000.0,
        }
    }
}

/// Concentration band boundaries, expressed on the configured scale.
///
/// Bands are lower-inclusive: an index exactly at `moderate_floor` is
/// ModeratelyConcentrated, exactly at `high_floor` is HighlyConcentrated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassificationBands {
    /// Index at or above which a group is at least moderately concentrated.
    pub moderate_floor: f64,

    /// Index at or above which a group is highly concentrated.
    pub high_floor: f64,
}

impl ClassificationBands {
    /// Default band boundaries (0.15 / 0.25 fractional) on the given scale.
    pub fn for_scale(scale: HhiScale) -> Self {
        Self {
            moderate_floor: 0.15 * scale.factor(),
            high_floor: 0.25 * scale.factor(),
        }
    }
}

impl Default for ClassificationBands {
    fn default() -> Self {
        Self::for_scale(HhiScale::Fraction)
    }
}

/// Parameters of a concentration analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum records a group must have to be reported. Groups below the
    /// threshold are excluded entirely, never reported with null metrics.
    pub min_group_records: u64,

    /// Rank cutoff for the top-N concentration share.
    pub top_n: u32,

    /// Market-share floor at or above which a vendor counts as dominant.
    pub dominance_threshold: f64,

    /// Scale for reported HHI values.
    pub scale: HhiScale,

    /// Classification band boundaries, on `scale`.
    pub bands: ClassificationBands,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_group_records: 5,
            top_n: 5,
            dominance_threshold: 0.10,
            scale: HhiScale::default(),
            bands: ClassificationBands::default(),
        }
    }
}

impl AnalysisConfig {
    /// Default config with bands rescaled to match the requested scale.
    pub fn with_scale(scale: HhiScale) -> Self {
        Self {
            scale,
            bands: ClassificationBands::for_scale(scale),
            ..Self::default()
        }
    }

    /// Load config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency of the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.min_group_records == 0 {
            return Err(AnalyticsError::Config(
                "min_group_records must be at least 1".to_string(),
            ));
        }
        if self.top_n == 0 {
            return Err(AnalyticsError::Config("top_n must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.dominance_threshold) {
            return Err(AnalyticsError::Config(format!(
                "dominance_threshold must be a fraction in [0, 1], got {}",
                self.dominance_threshold
            )));
        }
        let max_index = self.scale.factor();
        if self.bands.moderate_floor >= self.bands.high_floor {
            return Err(AnalyticsError::Config(format!(
                "band boundaries must be ordered: moderate_floor {} >= high_floor {}",
                self.bands.moderate_floor, self.bands.high_floor
            )));
        }
        if self.bands.moderate_floor < 0.0 || self.bands.high_floor > max_index {
            return Err(AnalyticsError::Config(format!(
                "band boundaries must lie within [0, {}] on the {:?} scale",
                max_index, self.scale
            )));
        }
        Ok(())
    }
}
