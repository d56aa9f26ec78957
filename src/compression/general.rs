//! General-purpose compression
//!
//! Deflates the framed value stream with zlib. This is the fallback for
//! payloads no content-aware strategy fits, and it is gated two ways: small
//! payloads are not worth the stream overhead, and high-entropy payloads
//! will not deflate, so the estimator rejects both without encoding.

use crate::compression::codec;
use crate::compression::traits::{CompressionError, CompressionResult, CompressionStrategy};
use crate::compression::types::{BlockMetadata, EncodedBlock, EstimateResult, StrategyKind};
use crate::types::Value;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Streams whose byte entropy exceeds this many bits per byte are treated
/// as incompressible.
const MAX_COMPRESSIBLE_ENTROPY: f64 = 5.0;

/// Expected ratio for payloads that pass the entropy gate; text-like data
/// deflates to roughly this share of its size.
const TEXT_LIKE_RATIO: f64 = 0.40;

/// How much of the stream the entropy probe samples
const ENTROPY_SAMPLE_BYTES: usize = 4096;

/// General-purpose (deflate) compression strategy
pub struct GeneralCompression {
    /// Streams below this many serialized bytes are rejected
    min_payload: usize,
}

impl GeneralCompression {
    pub fn new(min_payload: usize) -> Self {
        Self { min_payload }
    }

    /// Shannon entropy of the sampled stream in bits per byte
    fn byte_entropy(bytes: &[u8]) -> f64 {
        let sample = &bytes[..bytes.len().min(ENTROPY_SAMPLE_BYTES)];
        if sample.is_empty() {
            return 0.0;
        }

        let mut histogram = [0usize; 256];
        for &byte in sample {
            histogram[byte as usize] += 1;
        }

        let total = sample.len() as f64;
        histogram
            .iter()
            .filter(|&&count| count > 0)
            .map(|&count| {
                let p = count as f64 / total;
                -p * p.log2()
            })
            .sum()
    }
}

impl CompressionStrategy for GeneralCompression {
    fn kind(&self) -> StrategyKind {
        StrategyKind::General
    }

    fn estimate(&self, data: &[Value]) -> EstimateResult {
        let original = codec::encoded_len(data);
        if original < self.min_payload {
            return EstimateResult::incompatible(StrategyKind::General, original);
        }

        let raw = codec::serialize(data);
        if Self::byte_entropy(&raw) > MAX_COMPRESSIBLE_ENTROPY {
            return EstimateResult::incompatible(StrategyKind::General, original);
        }

        let estimated = (original as f64 * TEXT_LIKE_RATIO) as usize;
        EstimateResult::new(StrategyKind::General, original, estimated)
    }

    fn encode(&self, data: &[Value]) -> CompressionResult<EncodedBlock> {
        let raw = codec::serialize(data);
        if raw.len() < self.min_payload {
            return Err(CompressionError::Incompatible(format!(
                "{} bytes is below the {} byte floor for deflate",
                raw.len(),
                self.min_payload
            )));
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(6));
        encoder
            .write_all(&raw)
            .and_then(|_| encoder.finish())
            .map(|compressed| EncodedBlock {
                kind: StrategyKind::General,
                data: compressed,
                value_count: data.len(),
                metadata: BlockMetadata::General {
                    uncompressed_len: raw.len() as u32,
                },
            })
            .map_err(|e| CompressionError::EncodeFailed(format!("deflate: {}", e)))
    }

    fn decode(&self, block: &EncodedBlock) -> CompressionResult<Vec<Value>> {
        let uncompressed_len = match block.metadata {
            BlockMetadata::General { uncompressed_len } => uncompressed_len as usize,
            _ => {
                return Err(CompressionError::InvalidMetadata(
                    "expected general metadata".to_string(),
                ))
            }
        };

        let mut raw = Vec::with_capacity(uncompressed_len);
        ZlibDecoder::new(&block.data[..])
            .read_to_end(&mut raw)
            .map_err(|e| CompressionError::DecodeFailed(format!("inflate: {}", e)))?;

        if raw.len() != uncompressed_len {
            return Err(CompressionError::CorruptedData(format!(
                "inflated to {} bytes, metadata says {}",
                raw.len(),
                uncompressed_len
            )));
        }
        codec::read_values(&raw, block.value_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repetitive_text(count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| Value::text(format!("the quick brown fox number {} jumps over", i)))
            .collect()
    }

    #[test]
    fn test_round_trip_text() {
        let comp = GeneralCompression::new(128);
        let data = repetitive_text(20);

        let block = comp.encode(&data).unwrap();
        assert!(block.total_size() < codec::encoded_len(&data));

        let decoded = comp.decode(&block).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_small_payload_rejected() {
        let comp = GeneralCompression::new(128);
        let data = vec![Value::text("tiny")];
        assert_eq!(comp.estimate(&data).ratio(), 1.0);
        assert!(matches!(
            comp.encode(&data),
            Err(CompressionError::Incompatible(_))
        ));
    }

    #[test]
    fn test_low_entropy_estimate_accepted() {
        let comp = GeneralCompression::new(128);
        let est = comp.estimate(&repetitive_text(20));
        assert!(est.ratio() < 0.5);
    }

    #[test]
    fn test_high_entropy_estimate_rejected() {
        let comp = GeneralCompression::new(128);
        // Full-range byte payloads read as noise to the entropy probe
        let data: Vec<Value> = (0..8)
            .map(|seed: u32| {
                let bytes: Vec<u8> = (0..64u32)
                    .map(|i| {
                        let x = seed
                            .wrapping_mul(2654435761)
                            .wrapping_add(i.wrapping_mul(40503))
                            .wrapping_mul(2246822519);
                        (x >> 13) as u8
                    })
                    .collect();
                Value::Bytes(bytes)
            })
            .collect();

        assert_eq!(comp.estimate(&data).ratio(), 1.0);
    }

    #[test]
    fn test_truncated_stream_rejected() {
        let comp = GeneralCompression::new(128);
        let data = repetitive_text(20);
        let mut block = comp.encode(&data).unwrap();
        block.data.truncate(block.data.len() / 2);
        assert!(comp.decode(&block).is_err());
    }
}
