//! Prefix compression
//!
//! Removes the common prefix shared by every string in the payload and
//! stores it once, followed by the length-framed tails. This is the usual
//! shape of index key pages ("user_001", "user_002", ...), where the prefix
//! carries most of the bytes.

use crate::compression::codec;
use crate::compression::traits::{CompressionError, CompressionResult, CompressionStrategy};
use crate::compression::types::{BlockMetadata, EncodedBlock, EstimateResult, StrategyKind};
use crate::types::Value;

/// Shared prefixes shorter than this save too little to matter
pub const MIN_SHARED_PREFIX: usize = 4;

/// Prefix compression strategy
pub struct PrefixCompression;

impl PrefixCompression {
    pub fn new() -> Self {
        Self
    }

    /// Length in bytes of the prefix shared by every string, 0 when the
    /// payload is not all-text.
    pub fn shared_prefix_len(data: &[Value]) -> usize {
        let mut texts = data.iter().map(|v| match v {
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        });

        let first = match texts.next() {
            Some(Some(first)) => first,
            _ => return 0,
        };

        let mut len = first.len();
        for text in texts {
            let Some(text) = text else { return 0 };
            len = len
                .min(text.len())
                .min(first.iter().zip(text).take_while(|(a, b)| a == b).count());
            if len == 0 {
                return 0;
            }
        }
        len
    }
}

impl Default for PrefixCompression {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionStrategy for PrefixCompression {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Prefix
    }

    fn estimate(&self, data: &[Value]) -> EstimateResult {
        let original = codec::encoded_len(data);
        if data.len() < 2 {
            return EstimateResult::incompatible(StrategyKind::Prefix, original);
        }

        let prefix_len = Self::shared_prefix_len(data);
        if prefix_len < MIN_SHARED_PREFIX {
            return EstimateResult::incompatible(StrategyKind::Prefix, original);
        }

        // The prefix is stored once instead of N times
        let saved = prefix_len * (data.len() - 1);
        EstimateResult::new(
            StrategyKind::Prefix,
            original,
            original.saturating_sub(saved),
        )
    }

    fn encode(&self, data: &[Value]) -> CompressionResult<EncodedBlock> {
        if data.is_empty() {
            return Err(CompressionError::Incompatible(
                "prefix compression needs at least one value".to_string(),
            ));
        }
        let texts: Vec<&str> = data
            .iter()
            .map(|v| match v {
                Value::Text(s) => Ok(s.as_str()),
                other => Err(CompressionError::Incompatible(format!(
                    "prefix compression requires text, got {}",
                    other.type_name()
                ))),
            })
            .collect::<CompressionResult<_>>()?;

        let prefix_len = Self::shared_prefix_len(data);
        let prefix = &texts[0].as_bytes()[..prefix_len];

        let mut buf = Vec::new();
        buf.extend_from_slice(prefix);
        for text in &texts {
            let tail = &text.as_bytes()[prefix_len..];
            buf.extend_from_slice(&(tail.len() as u32).to_le_bytes());
            buf.extend_from_slice(tail);
        }

        Ok(EncodedBlock {
            kind: StrategyKind::Prefix,
            data: buf,
            value_count: data.len(),
            metadata: BlockMetadata::Prefix {
                prefix_len: prefix_len as u32,
            },
        })
    }

    fn decode(&self, block: &EncodedBlock) -> CompressionResult<Vec<Value>> {
        let prefix_len = match block.metadata {
            BlockMetadata::Prefix { prefix_len } => prefix_len as usize,
            _ => {
                return Err(CompressionError::InvalidMetadata(
                    "expected prefix metadata".to_string(),
                ))
            }
        };

        let mut offset = 0;
        let prefix = codec::take(&block.data, &mut offset, prefix_len)?.to_vec();

        let mut values = Vec::with_capacity(block.value_count);
        for _ in 0..block.value_count {
            let tail_len = codec::read_u32(&block.data, &mut offset)? as usize;
            let tail = codec::take(&block.data, &mut offset, tail_len)?;

            let mut bytes = Vec::with_capacity(prefix_len + tail_len);
            bytes.extend_from_slice(&prefix);
            bytes.extend_from_slice(tail);
            let s = String::from_utf8(bytes)
                .map_err(|e| CompressionError::CorruptedData(format!("invalid UTF-8: {}", e)))?;
            values.push(Value::Text(s));
        }

        if offset != block.data.len() {
            return Err(CompressionError::CorruptedData(
                "trailing bytes after prefix tails".to_string(),
            ));
        }
        Ok(values)
    }
}
