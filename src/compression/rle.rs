//! Run-length compression
//!
//! Encodes consecutive identical values as (value, count) pairs. Sorted or
//! heavily repeated payloads collapse to a handful of runs.

use crate::compression::codec;
use crate::compression::traits::{CompressionError, CompressionResult, CompressionStrategy};
use crate::compression::types::{BlockMetadata, EncodedBlock, EstimateResult, StrategyKind};
use crate::types::Value;

/// Run-length compression strategy
pub struct RunLengthCompression;

/// A single run of identical values
#[derive(Debug, Clone)]
struct Run {
    value: Value,
    count: u32,
}

impl RunLengthCompression {
    pub fn new() -> Self {
        Self
    }

    fn count_runs(data: &[Value]) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();
        for value in data {
            match runs.last_mut() {
                Some(run) if run.value == *value => run.count += 1,
                _ => runs.push(Run {
                    value: value.clone(),
                    count: 1,
                }),
            }
        }
        runs
    }

    /// Length of the longest run of identical values
    pub fn max_run_len(data: &[Value]) -> usize {
        Self::count_runs(data)
            .iter()
            .map(|run| run.count as usize)
            .max()
            .unwrap_or(0)
    }
}

impl Default for RunLengthCompression {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionStrategy for RunLengthCompression {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RunLength
    }

    fn estimate(&self, data: &[Value]) -> EstimateResult {
        let original = codec::encoded_len(data);
        if data.is_empty() {
            return EstimateResult::incompatible(StrategyKind::RunLength, original);
        }

        let runs = Self::count_runs(data);
        let estimated: usize = runs
            .iter()
            .map(|run| codec::encoded_size(&run.value) + 4)
            .sum();
        EstimateResult::new(StrategyKind::RunLength, original, estimated)
    }

    fn encode(&self, data: &[Value]) -> CompressionResult<EncodedBlock> {
        if data.is_empty() {
            return Err(CompressionError::Incompatible(
                "run-length compression needs at least one value".to_string(),
            ));
        }

        let runs = Self::count_runs(data);
        let mut buf = Vec::new();
        for run in &runs {
            codec::write_value(&mut buf, &run.value);
            buf.extend_from_slice(&run.count.to_le_bytes());
        }

        Ok(EncodedBlock {
            kind: StrategyKind::RunLength,
            data: buf,
            value_count: data.len(),
            metadata: BlockMetadata::RunLength {
                run_count: runs.len() as u32,
            },
        })
    }

    fn decode(&self, block: &EncodedBlock) -> CompressionResult<Vec<Value>> {
        let run_count = match block.metadata {
            BlockMetadata::RunLength { run_count } => run_count as usize,
            _ => {
                return Err(CompressionError::InvalidMetadata(
                    "expected run-length metadata".to_string(),
                ))
            }
        };

        let mut values = Vec::with_capacity(block.value_count);
        let mut offset = 0;
        for _ in 0..run_count {
            let value = codec::read_value(&block.data, &mut offset)?;
            let count = codec::read_u32(&block.data, &mut offset)?;
            for _ in 0..count {
                values.push(value.clone());
            }
        }

        if offset != block.data.len() {
            return Err(CompressionError::CorruptedData(
                "trailing bytes after run stream".to_string(),
            ));
        }
        if values.len() != block.value_count {
            return Err(CompressionError::CorruptedData(format!(
                "runs expand to {} values, block holds {}",
                values.len(),
                block.value_count
            )));
        }
        Ok(values)
    }
}
