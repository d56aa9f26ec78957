//! Tree-level statistics records

use crate::compression::StrategyKind;
use serde::Serialize;
use std::collections::BTreeMap;

/// Snapshot of tree shape and compression effectiveness, the numbers a
/// query planner would consult.
#[derive(Debug, Clone, Serialize)]
pub struct TreeStats {
    /// Number of levels; 1 for a lone leaf root, 0 when empty
    pub height: usize,
    /// Live pages in the tree
    pub node_count: usize,
    /// Entries across all leaves (duplicates counted)
    pub total_keys: usize,
    /// Mean page occupancy against the `order - 1` capacity
    pub avg_fill_ratio: f64,
    /// Global compressed-over-original ratio; `None` until a page compresses
    pub compression_ratio: Option<f64>,
}

/// Outcome of one `compress_all_pages` sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompressionReport {
    /// Pages offered for compression (already-compressed pages are skipped)
    pub attempts: u64,
    /// Pages that ended up compressed
    pub successes: u64,
    /// Pages where no stream beat the acceptance gates
    pub failures: u64,
    /// Bytes saved across newly compressed pages
    pub bytes_saved: u64,
    /// Stream counts per strategy that produced a block this sweep
    pub by_strategy: BTreeMap<StrategyKind, u64>,
}
