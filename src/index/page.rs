//! Tree pages
//!
//! Pages live in the tree's arena and reference each other by [`PageId`].
//! The id links (`parent`, `next_leaf`, `children`) are non-owning; the
//! arena owns every page and the tree's split/merge code keeps the links
//! consistent.

use crate::compression::{
    codec, CompressionError, CompressionManager, CompressionResult, EncodedBlock, StrategyKind,
};
use crate::types::{Key, KeyValue, Value};
use serde::{Deserialize, Serialize};

/// Non-owning handle to a page in the tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub(crate) usize);

/// Compressed state of a page: the encoded streams plus enough bookkeeping
/// to answer size questions without materializing.
#[derive(Debug, Clone)]
pub struct CompressedPage {
    /// Encoded key stream (leaf keys or internal separators)
    pub keys: EncodedBlock,
    /// Encoded value stream; `None` for internal pages
    pub values: Option<EncodedBlock>,
    /// Number of entries the page materializes back to
    pub entry_count: usize,
    /// Serialized size of the streams before compression
    pub original_bytes: usize,
    /// Total size of the encoded blocks
    pub compressed_bytes: usize,
}

impl CompressedPage {
    /// Bytes saved by holding this page compressed
    pub fn bytes_saved(&self) -> usize {
        self.original_bytes.saturating_sub(self.compressed_bytes)
    }

    /// Strategy tags that genuinely compressed one of the streams
    pub fn strategies(&self) -> impl Iterator<Item = StrategyKind> + '_ {
        std::iter::once(self.keys.kind)
            .chain(self.values.iter().map(|block| block.kind))
            .filter(|kind| *kind != StrategyKind::None)
    }
}

/// A single tree page.
///
/// Leaf pages hold `entries` and chain to the next leaf; internal pages
/// hold `separators` with `children.len() == separators.len() + 1`. A page
/// is either materialized (vectors populated, `compressed` empty) or
/// compressed (vectors empty, `compressed` holds the blobs); every reader
/// or writer materializes first.
#[derive(Debug)]
pub struct Page {
    pub(crate) is_leaf: bool,
    pub(crate) entries: Vec<KeyValue>,
    pub(crate) separators: Vec<Key>,
    pub(crate) children: Vec<PageId>,
    pub(crate) parent: Option<PageId>,
    pub(crate) next_leaf: Option<PageId>,
    pub(crate) compressed: Option<CompressedPage>,
}

impl Page {
    pub(crate) fn new_leaf() -> Self {
        Self {
            is_leaf: true,
            entries: Vec::new(),
            separators: Vec::new(),
            children: Vec::new(),
            parent: None,
            next_leaf: None,
            compressed: None,
        }
    }

    pub(crate) fn new_internal() -> Self {
        Self {
            is_leaf: false,
            ..Self::new_leaf()
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed.is_some()
    }

    /// Number of keys on the page, answered in either state
    pub fn key_count(&self) -> usize {
        match &self.compressed {
            Some(compressed) => compressed.entry_count,
            None if self.is_leaf => self.entries.len(),
            None => self.separators.len(),
        }
    }

    /// Occupancy against the `order - 1` entry capacity
    pub fn fill_ratio(&self, order: usize) -> f64 {
        self.key_count() as f64 / (order - 1) as f64
    }

    /// Compresses the page's streams in place.
    ///
    /// Leaf pages encode keys and values as two separate streams; internal
    /// pages encode the separator stream only. Child ids and sibling links
    /// are live references and never enter a blob. Returns `false` when the
    /// page is empty, already compressed, or no stream beat the acceptance
    /// gates (the page then stays materialized).
    pub(crate) fn compress(&mut self, manager: &mut CompressionManager) -> bool {
        if self.compressed.is_some() || self.key_count() == 0 {
            return false;
        }

        if self.is_leaf {
            let keys: Vec<Value> = self.entries.iter().map(|e| e.key.to_value()).collect();
            let values: Vec<Value> = self.entries.iter().map(|e| e.value.clone()).collect();
            let original_bytes = codec::encoded_len(&keys) + codec::encoded_len(&values);

            let key_block = manager.compress(&keys);
            let value_block = manager.compress(&values);
            if key_block.kind == StrategyKind::None && value_block.kind == StrategyKind::None {
                return false;
            }

            let compressed_bytes = key_block.total_size() + value_block.total_size();
            self.compressed = Some(CompressedPage {
                keys: key_block,
                values: Some(value_block),
                entry_count: self.entries.len(),
                original_bytes,
                compressed_bytes,
            });
            self.entries = Vec::new();
        } else {
            let keys: Vec<Value> = self.separators.iter().map(Key::to_value).collect();
            let original_bytes = codec::encoded_len(&keys);

            let key_block = manager.compress(&keys);
            if key_block.kind == StrategyKind::None {
                return false;
            }

            let compressed_bytes = key_block.total_size();
            self.compressed = Some(CompressedPage {
                keys: key_block,
                values: None,
                entry_count: self.separators.len(),
                original_bytes,
                compressed_bytes,
            });
            self.separators = Vec::new();
        }
        true
    }

    /// Restores the page's streams from its blobs; idempotent when already
    /// materialized.
    pub(crate) fn decompress(&mut self, manager: &CompressionManager) -> CompressionResult<()> {
        let Some(compressed) = &self.compressed else {
            return Ok(());
        };

        let keys = manager.decompress(&compressed.keys)?;
        if keys.len() != compressed.entry_count {
            return Err(CompressionError::CorruptedData(format!(
                "key stream decoded to {} values, page holds {}",
                keys.len(),
                compressed.entry_count
            )));
        }

        if self.is_leaf {
            let value_block = compressed.values.as_ref().ok_or_else(|| {
                CompressionError::InvalidMetadata("leaf page missing value stream".to_string())
            })?;
            let values = manager.decompress(value_block)?;
            if values.len() != keys.len() {
                return Err(CompressionError::CorruptedData(format!(
                    "value stream decoded to {} values, key stream to {}",
                    values.len(),
                    keys.len()
                )));
            }

            let mut entries = Vec::with_capacity(keys.len());
            for (key, value) in keys.into_iter().zip(values) {
                let key = Key::from_value(key).ok_or_else(|| {
                    CompressionError::CorruptedData(
                        "key stream decoded to a non-key value".to_string(),
                    )
                })?;
                entries.push(KeyValue::new(key, value));
            }
            self.entries = entries;
        } else {
            let mut separators = Vec::with_capacity(keys.len());
            for key in keys {
                separators.push(Key::from_value(key).ok_or_else(|| {
                    CompressionError::CorruptedData(
                        "separator stream decoded to a non-key value".to_string(),
                    )
                })?);
            }
            self.separators = separators;
        }

        self.compressed = None;
        Ok(())
    }
}
