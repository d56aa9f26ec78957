//! Block and metadata types shared across compression strategies

use crate::compression::codec;
use crate::types::Value;
use serde::{Deserialize, Serialize};

/// Strategy identifier carried in block metadata and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Shared-prefix elision for string payloads
    Prefix,
    /// Run-length encoding of repeated values
    RunLength,
    /// Base-plus-differences encoding for integer payloads
    Delta,
    /// Value table plus fixed-width index array
    Dictionary,
    /// General-purpose deflate stream
    General,
    /// Passthrough sentinel: no strategy produced an acceptable ratio
    None,
}

impl StrategyKind {
    /// Returns the tag name used in reports
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Prefix => "PREFIX",
            StrategyKind::RunLength => "RLE",
            StrategyKind::Delta => "DELTA",
            StrategyKind::Dictionary => "DICT",
            StrategyKind::General => "GENERAL",
            StrategyKind::None => "NONE",
        }
    }

    /// Relative cost of this strategy's decoder; ties on estimated ratio
    /// break toward the cheaper decoder.
    pub fn decoder_cost(&self) -> u8 {
        match self {
            StrategyKind::Prefix => 0,
            StrategyKind::RunLength => 1,
            StrategyKind::Delta => 2,
            StrategyKind::Dictionary => 3,
            StrategyKind::General => 4,
            StrategyKind::None => 5,
        }
    }
}

/// Result of a strategy's cheap size estimate.
#[derive(Debug, Clone)]
pub struct EstimateResult {
    /// Strategy that produced the estimate
    pub kind: StrategyKind,
    /// Serialized size of the input in bytes
    pub original_size: usize,
    /// Estimated encoded size in bytes
    pub estimated_size: usize,
}

impl EstimateResult {
    pub fn new(kind: StrategyKind, original_size: usize, estimated_size: usize) -> Self {
        Self {
            kind,
            original_size,
            estimated_size,
        }
    }

    /// An estimate that declines to compress (ratio 1.0)
    pub fn incompatible(kind: StrategyKind, original_size: usize) -> Self {
        Self::new(kind, original_size, original_size)
    }

    /// Estimated ratio, compressed over original; lower is better
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            1.0
        } else {
            self.estimated_size as f64 / self.original_size as f64
        }
    }
}

/// An encoded page stream: opaque bytes plus the metadata needed to reverse
/// the transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedBlock {
    /// Strategy that produced this block
    pub kind: StrategyKind,
    /// Encoded payload bytes
    pub data: Vec<u8>,
    /// Number of values the block decodes to
    pub value_count: usize,
    /// Strategy-specific parameters
    pub metadata: BlockMetadata,
}

impl EncodedBlock {
    /// Total footprint of the block in bytes
    pub fn total_size(&self) -> usize {
        self.data.len() + self.metadata.size()
    }

    /// Builds the passthrough block used when no strategy qualifies.
    pub fn passthrough(data: &[Value]) -> Self {
        let mut buf = Vec::new();
        for value in data {
            codec::write_value(&mut buf, value);
        }
        Self {
            kind: StrategyKind::None,
            data: buf,
            value_count: data.len(),
            metadata: BlockMetadata::None,
        }
    }
}

/// Strategy-specific block parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BlockMetadata {
    /// Passthrough carries no parameters
    None,

    /// Shared prefix length in bytes (the prefix itself leads the data)
    Prefix { prefix_len: u32 },

    /// Dictionary table and the width of each index entry
    Dictionary {
        /// Index width in bytes (1, 2, or 4)
        index_width: u8,
        /// Number of entries in the table
        dict_size: u32,
        /// Serialized value table
        dict_data: Vec<u8>,
    },

    /// First value and the fixed width of each stored difference
    Delta {
        base: i64,
        /// Delta width in bytes (1, 2, 4, or 8)
        delta_width: u8,
    },

    /// Number of (value, count) runs in the data
    RunLength { run_count: u32 },

    /// Length of the stream before deflate
    General { uncompressed_len: u32 },
}

impl BlockMetadata {
    /// Size of the metadata in bytes
    pub fn size(&self) -> usize {
        match self {
            BlockMetadata::None => 0,
            BlockMetadata::Prefix { .. } => std::mem::size_of::<u32>(),
            BlockMetadata::Dictionary { dict_data, .. } => {
                std::mem::size_of::<u8>() + std::mem::size_of::<u32>() + dict_data.len()
            }
            BlockMetadata::Delta { .. } => {
                std::mem::size_of::<i64>() + std::mem::size_of::<u8>()
            }
            BlockMetadata::RunLength { .. } => std::mem::size_of::<u32>(),
            BlockMetadata::General { .. } => std::mem::size_of::<u32>(),
        }
    }
}
