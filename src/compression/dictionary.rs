//! Dictionary compression
//!
//! Maps values to integer indices, storing each distinct value once in a
//! table and replacing occurrences with fixed-width indices. Effective on
//! low-cardinality payloads: status flags, categories, repeated payloads.

use crate::compression::codec;
use crate::compression::traits::{CompressionError, CompressionResult, CompressionStrategy};
use crate::compression::types::{BlockMetadata, EncodedBlock, EstimateResult, StrategyKind};
use crate::types::Value;
use std::collections::HashMap;

/// Payloads with distinct/total at or above this gain too little from a table
pub const MAX_DISTINCT_RATIO: f64 = 0.5;

/// Dictionary compression strategy
pub struct DictionaryCompression;

impl DictionaryCompression {
    pub fn new() -> Self {
        Self
    }

    /// Optimal index width for a table of the given size
    fn select_index_width(dict_size: usize) -> u8 {
        if dict_size < 256 {
            1
        } else if dict_size < 65536 {
            2
        } else {
            4
        }
    }

    /// Builds the table (insertion order) and the per-value indices.
    ///
    /// Values are keyed by their debug rendering; the payload enum has no
    /// total Eq because of doubles, and the rendering is exact for every
    /// variant.
    fn build_dictionary(data: &[Value]) -> (Vec<Value>, Vec<u32>) {
        let mut positions: HashMap<String, u32> = HashMap::new();
        let mut table: Vec<Value> = Vec::new();
        let mut indices: Vec<u32> = Vec::with_capacity(data.len());

        for value in data {
            let rendered = format!("{:?}", value);
            let idx = *positions.entry(rendered).or_insert_with(|| {
                table.push(value.clone());
                (table.len() - 1) as u32
            });
            indices.push(idx);
        }

        (table, indices)
    }

    fn encode_indices(indices: &[u32], width: u8) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(indices.len() * width as usize);
        match width {
            1 => {
                for &idx in indices {
                    bytes.push(idx as u8);
                }
            }
            2 => {
                for &idx in indices {
                    bytes.extend_from_slice(&(idx as u16).to_le_bytes());
                }
            }
            4 => {
                for &idx in indices {
                    bytes.extend_from_slice(&idx.to_le_bytes());
                }
            }
            _ => unreachable!("invalid index width"),
        }
        bytes
    }

    fn decode_indices(bytes: &[u8], width: u8, count: usize) -> CompressionResult<Vec<u32>> {
        if bytes.len() != count * width as usize {
            return Err(CompressionError::CorruptedData(format!(
                "index array holds {} bytes, expected {}",
                bytes.len(),
                count * width as usize
            )));
        }

        let mut indices = Vec::with_capacity(count);
        match width {
            1 => {
                for &byte in bytes {
                    indices.push(byte as u32);
                }
            }
            2 => {
                for chunk in bytes.chunks_exact(2) {
                    indices.push(u16::from_le_bytes([chunk[0], chunk[1]]) as u32);
                }
            }
            4 => {
                for chunk in bytes.chunks_exact(4) {
                    indices.push(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
                }
            }
            _ => {
                return Err(CompressionError::InvalidMetadata(format!(
                    "invalid index width: {}",
                    width
                )))
            }
        }
        Ok(indices)
    }
}

impl Default for DictionaryCompression {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionStrategy for DictionaryCompression {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Dictionary
    }

    fn estimate(&self, data: &[Value]) -> EstimateResult {
        let original = codec::encoded_len(data);
        if data.is_empty() {
            return EstimateResult::incompatible(StrategyKind::Dictionary, original);
        }

        let (table, _) = Self::build_dictionary(data);
        let distinct_ratio = table.len() as f64 / data.len() as f64;
        if distinct_ratio >= MAX_DISTINCT_RATIO {
            return EstimateResult::incompatible(StrategyKind::Dictionary, original);
        }

        let index_width = Self::select_index_width(table.len()) as usize;
        let table_bytes = 4 + codec::encoded_len(&table);
        let estimated = table_bytes + data.len() * index_width;
        EstimateResult::new(StrategyKind::Dictionary, original, estimated)
    }

    fn encode(&self, data: &[Value]) -> CompressionResult<EncodedBlock> {
        if data.is_empty() {
            return Err(CompressionError::Incompatible(
                "dictionary compression needs at least one value".to_string(),
            ));
        }

        let (table, indices) = Self::build_dictionary(data);
        let index_width = Self::select_index_width(table.len());

        let mut dict_data = Vec::new();
        dict_data.extend_from_slice(&(table.len() as u32).to_le_bytes());
        codec::write_values(&mut dict_data, &table);

        Ok(EncodedBlock {
            kind: StrategyKind::Dictionary,
            data: Self::encode_indices(&indices, index_width),
            value_count: data.len(),
            metadata: BlockMetadata::Dictionary {
                index_width,
                dict_size: table.len() as u32,
                dict_data,
            },
        })
    }

    fn decode(&self, block: &EncodedBlock) -> CompressionResult<Vec<Value>> {
        let (index_width, dict_size, dict_data) = match &block.metadata {
            BlockMetadata::Dictionary {
                index_width,
                dict_size,
                dict_data,
            } => (*index_width, *dict_size as usize, dict_data),
            _ => {
                return Err(CompressionError::InvalidMetadata(
                    "expected dictionary metadata".to_string(),
                ))
            }
        };

        let mut offset = 0;
        let stored_size = codec::read_u32(dict_data, &mut offset)? as usize;
        if stored_size != dict_size {
            return Err(CompressionError::CorruptedData(format!(
                "table header says {} entries, metadata says {}",
                stored_size, dict_size
            )));
        }
        let table = codec::read_values(&dict_data[offset..], dict_size)?;

        let indices = Self::decode_indices(&block.data, index_width, block.value_count)?;
        let mut values = Vec::with_capacity(block.value_count);
        for idx in indices {
            let entry = table.get(idx as usize).ok_or_else(|| {
                CompressionError::CorruptedData(format!(
                    "index {} outside table of {} entries",
                    idx, dict_size
                ))
            })?;
            values.push(entry.clone());
        }
        Ok(values)
    }
}
