//! Delta compression
//!
//! Stores the first integer as a base and every following value as the
//! difference from its predecessor, using the narrowest fixed width that
//! holds every difference. Sequential identifiers and timestamps collapse
//! to one byte per entry.

use crate::compression::codec;
use crate::compression::traits::{CompressionError, CompressionResult, CompressionStrategy};
use crate::compression::types::{BlockMetadata, EncodedBlock, EstimateResult, StrategyKind};
use crate::types::Value;

/// Delta compression strategy
pub struct DeltaCompression;

impl DeltaCompression {
    pub fn new() -> Self {
        Self
    }

    /// Extracts the integer payloads, or `None` if any value is not an
    /// integer or any adjacent difference overflows i64.
    fn deltas_of(data: &[Value]) -> Option<(i64, Vec<i64>)> {
        let mut ints = data.iter().map(|v| match v {
            Value::Integer(i) => Some(*i),
            _ => None,
        });

        let base = ints.next()??;
        let mut prev = base;
        let mut deltas = Vec::with_capacity(data.len() - 1);
        for value in ints {
            let current = value?;
            deltas.push(current.checked_sub(prev)?);
            prev = current;
        }
        Some((base, deltas))
    }

    /// Narrowest width in bytes that holds the difference
    fn width_for(delta: i64) -> u8 {
        if i8::try_from(delta).is_ok() {
            1
        } else if i16::try_from(delta).is_ok() {
            2
        } else if i32::try_from(delta).is_ok() {
            4
        } else {
            8
        }
    }

    fn write_delta(buf: &mut Vec<u8>, delta: i64, width: u8) {
        match width {
            1 => buf.push(delta as i8 as u8),
            2 => buf.extend_from_slice(&(delta as i16).to_le_bytes()),
            4 => buf.extend_from_slice(&(delta as i32).to_le_bytes()),
            8 => buf.extend_from_slice(&delta.to_le_bytes()),
            _ => unreachable!("invalid delta width"),
        }
    }

    fn read_delta(bytes: &[u8], offset: &mut usize, width: u8) -> CompressionResult<i64> {
        let raw = codec::take(bytes, offset, width as usize)?;
        Ok(match width {
            1 => raw[0] as i8 as i64,
            2 => i16::from_le_bytes([raw[0], raw[1]]) as i64,
            4 => i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64,
            8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(raw);
                i64::from_le_bytes(buf)
            }
            _ => {
                return Err(CompressionError::InvalidMetadata(format!(
                    "invalid delta width: {}",
                    width
                )))
            }
        })
    }
}

impl Default for DeltaCompression {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionStrategy for DeltaCompression {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Delta
    }

    fn estimate(&self, data: &[Value]) -> EstimateResult {
        let original = codec::encoded_len(data);
        if data.len() < 2 {
            return EstimateResult::incompatible(StrategyKind::Delta, original);
        }

        let Some((_, deltas)) = Self::deltas_of(data) else {
            return EstimateResult::incompatible(StrategyKind::Delta, original);
        };

        let width = deltas.iter().map(|d| Self::width_for(*d)).max().unwrap_or(1);
        // Base value plus one fixed-width difference per remaining entry
        let estimated = 9 + deltas.len() * width as usize;
        EstimateResult::new(StrategyKind::Delta, original, estimated)
    }

    fn encode(&self, data: &[Value]) -> CompressionResult<EncodedBlock> {
        if data.len() < 2 {
            return Err(CompressionError::Incompatible(
                "delta compression needs at least two values".to_string(),
            ));
        }
        let (base, deltas) = Self::deltas_of(data).ok_or_else(|| {
            CompressionError::Incompatible(
                "delta compression requires integer values with bounded differences".to_string(),
            )
        })?;

        let width = deltas.iter().map(|d| Self::width_for(*d)).max().unwrap_or(1);
        let mut buf = Vec::with_capacity(deltas.len() * width as usize);
        for delta in &deltas {
            Self::write_delta(&mut buf, *delta, width);
        }

        Ok(EncodedBlock {
            kind: StrategyKind::Delta,
            data: buf,
            value_count: data.len(),
            metadata: BlockMetadata::Delta {
                base,
                delta_width: width,
            },
        })
    }

    fn decode(&self, block: &EncodedBlock) -> CompressionResult<Vec<Value>> {
        let (base, width) = match block.metadata {
            BlockMetadata::Delta { base, delta_width } => (base, delta_width),
            _ => {
                return Err(CompressionError::InvalidMetadata(
                    "expected delta metadata".to_string(),
                ))
            }
        };

        let mut values = Vec::with_capacity(block.value_count);
        values.push(Value::Integer(base));

        let mut current = base;
        let mut offset = 0;
        for _ in 1..block.value_count {
            let delta = Self::read_delta(&block.data, &mut offset, width)?;
            current = current.checked_add(delta).ok_or_else(|| {
                CompressionError::CorruptedData("delta accumulation overflowed".to_string())
            })?;
            values.push(Value::Integer(current));
        }

        if offset != block.data.len() {
            return Err(CompressionError::CorruptedData(
                "trailing bytes after delta stream".to_string(),
            ));
        }
        Ok(values)
    }
}
