//! Compression strategy trait
//!
//! All strategies implement this trait to provide a uniform interface for
//! estimation, encoding, and decoding. The manager owns strategy selection;
//! a strategy only answers "how well would I do" and "encode/decode this".

use crate::compression::types::{EncodedBlock, EstimateResult, StrategyKind};
use crate::types::Value;
use thiserror::Error;

/// Compression error type, internal to the compression layer.
///
/// Encode-side variants (`Incompatible`, `EncodeFailed`) are absorbed by the
/// manager, which downgrades to a passthrough block. Decode-side variants
/// surface to the tree as [`crate::common::BirchError::Decompression`].
#[derive(Error, Debug, Clone)]
pub enum CompressionError {
    /// Data cannot be encoded with this strategy
    #[error("incompatible data: {0}")]
    Incompatible(String),

    /// Encoding failed
    #[error("encode failed: {0}")]
    EncodeFailed(String),

    /// Decoding failed
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// Block metadata does not match the strategy that produced it
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Blob contents are inconsistent with their metadata
    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// Result type for compression operations
pub type CompressionResult<T> = Result<T, CompressionError>;

/// Interface implemented by every compression strategy.
pub trait CompressionStrategy {
    /// Identifies this strategy in block metadata and statistics
    fn kind(&self) -> StrategyKind;

    /// Cheaply estimates the encoded size without performing a full encode.
    ///
    /// Incompatible data reports an estimate equal to the original size
    /// (ratio 1.0) rather than an error, so the selector can simply skip it.
    fn estimate(&self, data: &[Value]) -> EstimateResult;

    /// Encodes the values into a block
    fn encode(&self, data: &[Value]) -> CompressionResult<EncodedBlock>;

    /// Decodes a block back into the exact original value sequence
    fn decode(&self, block: &EncodedBlock) -> CompressionResult<Vec<Value>>;
}
