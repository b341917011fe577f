//! Stage 3: concentration index, per-group statistics and classification.

use crate::config::{AnalysisConfig, ClassificationBands};
use crate::model::{ConcentrationEntry, ConcentrationLevel, GroupTotals, MarketShare};
use itertools::Itertools;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Herfindahl-Hirschman Index on the fractional scale: the sum of squared
/// market shares. 1/n for perfectly even spend, 1.0 for a single vendor.
pub fn herfindahl_index(shares: &[f64]) -> f64 {
    shares.iter().map(|s| s * s).sum()
}

/// Band classification, lower-inclusive on each boundary: an index exactly
/// at `moderate_floor` is Moderate, exactly at `high_floor` is High.
///
/// `hhi` and `bands` must be expressed on the same scale.
pub fn classify(hhi: f64, bands: &ClassificationBands) -> ConcentrationLevel {
    if hhi >= bands.high_floor {
        ConcentrationLevel::HighlyConcentrated
    } else if hhi >= bands.moderate_floor {
        ConcentrationLevel::ModeratelyConcentrated
    } else {
        ConcentrationLevel::Competitive
    }
}

/// Build one report entry per group, sorted by hhi descending (ties broken
/// by group key ascending for determinism).
///
/// The uniform-share fallback upstream guarantees every group has defined
/// shares, so the index is never NaN.
pub fn build_report(
    shares: &[MarketShare],
    group_totals: &[GroupTotals],
    config: &AnalysisConfig,
) -> Vec<ConcentrationEntry> {
    let totals_by_group: BTreeMap<_, &GroupTotals> = group_totals
        .iter()
        .map(|t| (t.group_key.clone(), t))
        .collect();

    let mut entries = Vec::new();
    for (group_key, rows) in &shares
        .iter()
        .sorted_by(|a, b| a.group_key.cmp(&b.group_key))
        .group_by(|s| s.group_key.clone())
    {
        let rows: Vec<&MarketShare> = rows.collect();
        let totals = match totals_by_group.get(&group_key) {
            Some(totals) => *totals,
            None => {
                debug!("No group totals for {}, skipping", group_key);
                continue;
            }
        };

        let fractions: Vec<f64> = rows.iter().map(|r| r.share).collect();
        let hhi = herfindahl_index(&fractions) * config.scale.factor();
        let top_n_share: f64 = rows
            .iter()
            .filter(|r| r.rank <= config.top_n)
            .map(|r| r.share)
            .sum();
        let vendors_over_threshold = rows
            .iter()
            .filter(|r| r.share >= config.dominance_threshold)
            .count() as u64;

        entries.push(ConcentrationEntry {
            group_key,
            total_spend: totals.total_spend,
            total_records: totals.total_records,
            hhi,
            top_n_share,
            unique_vendors: rows.len() as u64,
            vendors_over_threshold,
            concentration_level: classify(hhi, &config.bands),
        });
    }

    entries.sort_by(|a, b| {
        b.hhi
            .partial_cmp(&a.hhi)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.group_key.cmp(&b.group_key))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HhiScale;
    use crate::model::GroupKey;

    fn share_row(org: &str, vendor: &str, amount: f64, share: f64, rank: u32) -> MarketShare {
        MarketShare {
            group_key: GroupKey::organization(org),
            vendor_name: vendor.to_string(),
            total_amount: amount,
            share,
            rank,
        }
    }

    fn totals(org: &str, spend: f64, records: u64) -> GroupTotals {
        GroupTotals {
            group_key: GroupKey::organization(org),
            total_spend: spend,
            total_records: records,
        }
    }

    #[test]
    fn hhi_of_even_and_single_vendor_groups() {
        assert!((herfindahl_index(&[0.5, 0.5]) - 0.5).abs() < 1e-12);
        assert!((herfindahl_index(&[1.0]) - 1.0).abs() < 1e-12);
        assert!((herfindahl_index(&[0.6, 0.3, 0.1]) - 0.46).abs() < 1e-12);
    }

    #[test]
    fn classification_boundaries_are_lower_inclusive() {
        let bands = ClassificationBands::default();
        assert_eq!(classify(0.1499, &bands), ConcentrationLevel::Competitive);
        assert_eq!(
            classify(0.15, &bands),
            ConcentrationLevel::ModeratelyConcentrated
        );
        assert_eq!(
            classify(0.2499, &bands),
            ConcentrationLevel::ModeratelyConcentrated
        );
        assert_eq!(classify(0.25, &bands), ConcentrationLevel::HighlyConcentrated);
    }

    #[test]
    fn report_entry_for_the_dot_scenario() {
        let shares = vec![
            share_row("DOT", "A", 600.0, 0.6, 1),
            share_row("DOT", "B", 300.0, 0.3, 2),
            share_row("DOT", "C", 100.0, 0.1, 3),
        ];
        let group_totals = vec![totals("DOT", 1000.0, 6)];
        let report = build_report(&shares, &group_totals, &AnalysisConfig::default());

        assert_eq!(report.len(), 1);
        let entry = &report[0];
        assert!((entry.hhi - 0.46).abs() < 1e-9);
        assert!((entry.top_n_share - 1.0).abs() < 1e-9);
        assert_eq!(entry.unique_vendors, 3);
        assert_eq!(entry.vendors_over_threshold, 3);
        assert_eq!(
            entry.concentration_level,
            ConcentrationLevel::HighlyConcentrated
        );
    }

    #[test]
    fn top_n_cutoff_excludes_lower_ranks() {
        let config = AnalysisConfig {
            top_n: 1,
            ..AnalysisConfig::default()
        };
        let shares = vec![
            share_row("DOT", "A", 600.0, 0.6, 1),
            share_row("DOT", "B", 400.0, 0.4, 2),
        ];
        let group_totals = vec![totals("DOT", 1000.0, 6)];
        let report = build_report(&shares, &group_totals, &config);
        assert!((report[0].top_n_share - 0.6).abs() < 1e-9);
    }

    #[test]
    fn dominance_threshold_is_inclusive() {
        let shares = vec![
            share_row("DOT", "A", 900.0, 0.90, 1),
            share_row("DOT", "B", 100.0, 0.10, 2),
        ];
        let group_totals = vec![totals("DOT", 1000.0, 6)];
        let report = build_report(&shares, &group_totals, &AnalysisConfig::default());
        assert_eq!(report[0].vendors_over_threshold, 2);
    }

    #[test]
    fn points_scale_rescales_hhi_and_classification_agrees() {
        let config = AnalysisConfig::with_scale(HhiScale::Points);
        let shares = vec![
            share_row("DOT", "A", 600.0, 0.6, 1),
            share_row("DOT", "B", 300.0, 0.3, 2),
            share_row("DOT", "C", 100.0, 0.1, 3),
        ];
        let group_totals = vec![totals("DOT", 1000.0, 6)];
        let report = build_report(&shares, &group_totals, &config);
        assert!((report[0].hhi - 4600.0).abs() < 1e-6);
        assert_eq!(
            report[0].concentration_level,
            ConcentrationLevel::HighlyConcentrated
        );
    }

    #[test]
    fn report_sorts_by_hhi_descending_with_key_tiebreak() {
        let shares = vec![
            share_row("LOW", "A", 250.0, 0.25, 1),
            share_row("LOW", "B", 250.0, 0.25, 1),
            share_row("LOW", "C", 250.0, 0.25, 1),
            share_row("LOW", "D", 250.0, 0.25, 1),
            share_row("HIGH", "X", 1000.0, 1.0, 1),
            share_row("ALSO", "Y", 500.0, 0.5, 1),
            share_row("ALSO", "Z", 500.0, 0.5, 1),
            share_row("BETA", "P", 500.0, 0.5, 1),
            share_row("BETA", "Q", 500.0, 0.5, 1),
        ];
        let group_totals = vec![
            totals("LOW", 1000.0, 8),
            totals("HIGH", 1000.0, 5),
            totals("ALSO", 1000.0, 5),
            totals("BETA", 1000.0, 5),
        ];
        let report = build_report(&shares, &group_totals, &AnalysisConfig::default());
        let order: Vec<&str> = report
            .iter()
            .map(|e| e.group_key.organization.as_str())
            .collect();
        // HIGH (1.0), then the 0.5 tie broken lexicographically, then LOW.
        assert_eq!(order, vec!["HIGH", "ALSO", "BETA", "LOW"]);
    }
}
