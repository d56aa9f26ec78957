//! Strategy selection and compression bookkeeping
//!
//! The manager fingerprints a payload, picks the strategy with the best
//! cheap size estimate, encodes, and verifies the encoded block actually
//! earned its keep. Anything that fails along the way degrades to a
//! passthrough block; encode-side errors never leave this module.

use crate::compression::codec;
use crate::compression::delta::DeltaCompression;
use crate::compression::dictionary::{DictionaryCompression, MAX_DISTINCT_RATIO};
use crate::compression::general::GeneralCompression;
use crate::compression::prefix::{PrefixCompression, MIN_SHARED_PREFIX};
use crate::compression::rle::RunLengthCompression;
use crate::compression::traits::{CompressionError, CompressionResult, CompressionStrategy};
use crate::compression::types::{EncodedBlock, StrategyKind};
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Integer payloads qualify for delta when at least this share of adjacent
/// pairs is non-decreasing.
const MIN_MONOTONIC_RATIO: f64 = 0.9;

/// Run-length qualifies when the longest run reaches this length
const MIN_DOMINANT_RUN: usize = 4;

/// Configuration for the compression manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Payloads smaller than this skip the general-purpose strategy
    pub min_payload_for_general: usize,

    /// Estimated ratios above this reject compression before encoding
    pub estimate_acceptance: f64,

    /// Actual ratios at or above this discard the encoded block
    pub encode_acceptance: f64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            min_payload_for_general: 128,
            estimate_acceptance: 0.9,
            encode_acceptance: 0.95,
        }
    }
}

/// Per-strategy compression counters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StrategyCounters {
    /// Blocks successfully encoded with this strategy
    pub count: u64,
    /// Serialized input bytes across those blocks
    pub bytes_in: u64,
    /// Encoded output bytes across those blocks
    pub bytes_out: u64,
}

/// Aggregated compression statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompressionStats {
    /// Payloads offered to the manager
    pub attempts: u64,
    /// Payloads that ended up genuinely compressed
    pub successes: u64,
    /// Counters per strategy that produced at least one block
    pub by_strategy: BTreeMap<StrategyKind, StrategyCounters>,
}

impl CompressionStats {
    /// Total serialized input bytes over all successful blocks
    pub fn bytes_in(&self) -> u64 {
        self.by_strategy.values().map(|c| c.bytes_in).sum()
    }

    /// Total encoded output bytes over all successful blocks
    pub fn bytes_out(&self) -> u64 {
        self.by_strategy.values().map(|c| c.bytes_out).sum()
    }

    /// Global ratio (compressed over original); `None` until something
    /// compressed.
    pub fn global_ratio(&self) -> Option<f64> {
        let bytes_in = self.bytes_in();
        if bytes_in == 0 {
            None
        } else {
            Some(self.bytes_out() as f64 / bytes_in as f64)
        }
    }
}

/// Cheap summary statistics of a payload, used to decide which strategies
/// are worth estimating.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub value_count: usize,
    pub payload_bytes: usize,
    pub all_text: bool,
    pub all_integer: bool,
    /// Distinct values over total values
    pub distinct_ratio: f64,
    /// Byte length of the prefix shared by every string (0 unless all text)
    pub common_prefix_len: usize,
    /// Length of the longest run of identical values
    pub max_run_len: usize,
    /// Share of adjacent integer pairs that are non-decreasing (0 unless
    /// all integers)
    pub monotonic_ratio: f64,
}

impl Fingerprint {
    pub fn of(data: &[Value]) -> Self {
        let value_count = data.len();
        let payload_bytes = codec::encoded_len(data);
        let all_text = !data.is_empty() && data.iter().all(|v| matches!(v, Value::Text(_)));
        let all_integer = !data.is_empty() && data.iter().all(|v| matches!(v, Value::Integer(_)));

        let distinct: HashSet<String> = data.iter().map(|v| format!("{:?}", v)).collect();
        let distinct_ratio = if value_count == 0 {
            1.0
        } else {
            distinct.len() as f64 / value_count as f64
        };

        let common_prefix_len = if all_text {
            PrefixCompression::shared_prefix_len(data)
        } else {
            0
        };

        let monotonic_ratio = if all_integer && value_count >= 2 {
            let non_decreasing = data
                .windows(2)
                .filter(|pair| match (&pair[0], &pair[1]) {
                    (Value::Integer(a), Value::Integer(b)) => b >= a,
                    _ => false,
                })
                .count();
            non_decreasing as f64 / (value_count - 1) as f64
        } else {
            0.0
        };

        Self {
            value_count,
            payload_bytes,
            all_text,
            all_integer,
            distinct_ratio,
            common_prefix_len,
            max_run_len: RunLengthCompression::max_run_len(data),
            monotonic_ratio,
        }
    }
}

/// Selects, applies, and reverses compression strategies, tracking
/// statistics for every attempt.
pub struct CompressionManager {
    config: CompressionConfig,
    strategies: Vec<Box<dyn CompressionStrategy>>,
    stats: CompressionStats,
}

impl CompressionManager {
    pub fn new(config: CompressionConfig) -> Self {
        let strategies: Vec<Box<dyn CompressionStrategy>> = vec![
            Box::new(PrefixCompression::new()),
            Box::new(RunLengthCompression::new()),
            Box::new(DeltaCompression::new()),
            Box::new(DictionaryCompression::new()),
            Box::new(GeneralCompression::new(config.min_payload_for_general)),
        ];
        Self {
            config,
            strategies,
            stats: CompressionStats::default(),
        }
    }

    /// Compresses the payload with the best-fitting strategy.
    ///
    /// Always returns a block; when no strategy qualifies, a strategy
    /// errors, or the encoded block misses the acceptance gate, the block is
    /// a passthrough tagged [`StrategyKind::None`]. The attempt is counted
    /// either way; only genuinely compressed blocks count as successes.
    pub fn compress(&mut self, data: &[Value]) -> EncodedBlock {
        if data.is_empty() {
            return EncodedBlock::passthrough(data);
        }

        self.stats.attempts += 1;
        let original = codec::encoded_len(data);
        let fingerprint = Fingerprint::of(data);

        let mut best: Option<(f64, StrategyKind)> = None;
        for strategy in &self.strategies {
            let kind = strategy.kind();
            if !self.applicable(kind, &fingerprint) {
                continue;
            }
            let ratio = strategy.estimate(data).ratio();
            let better = match best {
                None => true,
                Some((best_ratio, best_kind)) => {
                    ratio < best_ratio
                        || (ratio == best_ratio && kind.decoder_cost() < best_kind.decoder_cost())
                }
            };
            if better {
                best = Some((ratio, kind));
            }
        }

        let Some((ratio, kind)) = best else {
            return EncodedBlock::passthrough(data);
        };
        if ratio > self.config.estimate_acceptance {
            return EncodedBlock::passthrough(data);
        }

        let encoded = match self.strategy(kind) {
            Some(strategy) => strategy.encode(data),
            None => return EncodedBlock::passthrough(data),
        };
        // Encode failures downgrade to passthrough; the caller never sees them
        let block = match encoded {
            Ok(block) => block,
            Err(_) => return EncodedBlock::passthrough(data),
        };

        let actual = block.total_size() as f64 / original.max(1) as f64;
        if actual >= self.config.encode_acceptance {
            return EncodedBlock::passthrough(data);
        }

        self.stats.successes += 1;
        let counters = self.stats.by_strategy.entry(kind).or_default();
        counters.count += 1;
        counters.bytes_in += original as u64;
        counters.bytes_out += block.total_size() as u64;
        block
    }

    /// Reverses a block produced by [`Self::compress`]
    pub fn decompress(&self, block: &EncodedBlock) -> CompressionResult<Vec<Value>> {
        match block.kind {
            StrategyKind::None => codec::read_values(&block.data, block.value_count),
            kind => self
                .strategy(kind)
                .ok_or_else(|| {
                    CompressionError::InvalidMetadata(format!(
                        "no decoder for strategy {}",
                        kind.name()
                    ))
                })?
                .decode(block),
        }
    }

    /// Runs every strategy's estimator without committing to any of them
    pub fn estimate_all(&self, data: &[Value]) -> BTreeMap<StrategyKind, f64> {
        self.strategies
            .iter()
            .map(|s| (s.kind(), s.estimate(data).ratio()))
            .collect()
    }

    pub fn stats(&self) -> &CompressionStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CompressionStats::default();
    }

    fn strategy(&self, kind: StrategyKind) -> Option<&dyn CompressionStrategy> {
        self.strategies
            .iter()
            .find(|s| s.kind() == kind)
            .map(|s| s.as_ref())
    }

    fn applicable(&self, kind: StrategyKind, fp: &Fingerprint) -> bool {
        match kind {
            StrategyKind::Prefix => {
                fp.all_text && fp.value_count >= 2 && fp.common_prefix_len >= MIN_SHARED_PREFIX
            }
            StrategyKind::Dictionary => fp.distinct_ratio < MAX_DISTINCT_RATIO,
            StrategyKind::Delta => {
                fp.all_integer && fp.value_count >= 2 && fp.monotonic_ratio >= MIN_MONOTONIC_RATIO
            }
            StrategyKind::RunLength => fp.max_run_len >= MIN_DOMINANT_RUN,
            StrategyKind::General => fp.payload_bytes >= self.config.min_payload_for_general,
            StrategyKind::None => false,
        }
    }
}

impl Default for CompressionManager {
    fn default() -> Self {
        Self::new(CompressionConfig::default())
    }
}
