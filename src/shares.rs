//! Stage 2: market shares and dense ranking.
//!
//! Replaces the window-function logic the original SQL expressed inline
//! (`CASE WHEN total_spend > 0 ...` and `DENSE_RANK() OVER (...)`) with
//! named operations whose edge cases are unit-testable on their own.

use crate::model::{GroupTotals, MarketShare, VendorSpend};
use itertools::Itertools;
use std::collections::BTreeMap;
use tracing::debug;

/// 1-based dense ranks for `amounts`, ranking descending.
///
/// Tied amounts share a rank; the next distinct amount advances by exactly
/// one position, so two vendors tied at rank 1 are followed by rank 2.
pub fn dense_rank(amounts: &[f64]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..amounts.len()).collect();
    order.sort_by(|&a, &b| {
        amounts[b]
            .partial_cmp(&amounts[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0u32; amounts.len()];
    let mut rank = 0u32;
    let mut previous: Option<f64> = None;
    for idx in order {
        if previous != Some(amounts[idx]) {
            rank += 1;
            previous = Some(amounts[idx]);
        }
        ranks[idx] = rank;
    }
    ranks
}

/// Fractional shares for one group's vendor totals.
///
/// Normal case divides by the group total; a non-positive total falls back
/// to a uniform 1/n share per vendor so shares stay defined and sum to 1.0,
/// keeping division-by-zero out of the index computation.
pub fn group_shares(vendor_totals: &[f64], total_spend: f64) -> Vec<f64> {
    if vendor_totals.is_empty() {
        return Vec::new();
    }
    if total_spend > 0.0 {
        vendor_totals.iter().map(|t| t / total_spend).collect()
    } else {
        let uniform = 1.0 / vendor_totals.len() as f64;
        vec![uniform; vendor_totals.len()]
    }
}

/// Derive per-vendor market shares and ranks from the aggregated totals.
///
/// Output is ordered by group key, then rank ascending within the group.
pub fn compute_shares(
    vendor_spend: &[VendorSpend],
    group_totals: &[GroupTotals],
) -> Vec<MarketShare> {
    let totals_by_group: BTreeMap<_, f64> = group_totals
        .iter()
        .map(|t| (t.group_key.clone(), t.total_spend))
        .collect();

    let mut result = Vec::with_capacity(vendor_spend.len());
    for (group_key, vendors) in &vendor_spend
        .iter()
        .sorted_by(|a, b| a.group_key.cmp(&b.group_key))
        .group_by(|v| v.group_key.clone())
    {
        let vendors: Vec<&VendorSpend> = vendors.collect();
        let total_spend = match totals_by_group.get(&group_key) {
            Some(total) => *total,
            // Vendor rows without a group total never reach this stage via
            // the engine; skip rather than divide by an unknown total.
            None => {
                debug!("No group total for {}, skipping {} vendor rows", group_key, vendors.len());
                continue;
            }
        };

        let amounts: Vec<f64> = vendors.iter().map(|v| v.total_amount).collect();
        let shares = group_shares(&amounts, total_spend);
        let ranks = dense_rank(&amounts);

        let mut group_rows: Vec<MarketShare> = vendors
            .iter()
            .zip(shares.iter().zip(ranks.iter()))
            .map(|(vendor, (&share, &rank))| MarketShare {
                group_key: vendor.group_key.clone(),
                vendor_name: vendor.vendor_name.clone(),
                total_amount: vendor.total_amount,
                share,
                rank,
            })
            .collect();
        group_rows.sort_by(|a, b| a.rank.cmp(&b.rank).then(a.vendor_name.cmp(&b.vendor_name)));
        result.extend(group_rows);
    }
    result
}
