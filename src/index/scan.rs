//! Range scan cursor

use crate::common::error::BirchResult;
use crate::index::btree::BTreeIndex;
use crate::index::page::PageId;
use crate::types::{Key, Value};

/// Pull-based cursor over a key range.
///
/// The cursor walks the leaf chain, materializing pages as it reaches them,
/// and stops at the first key past the upper bound. It borrows the tree
/// mutably for its whole lifetime, so the tree cannot be mutated while a
/// scan is live.
pub struct RangeScan<'a> {
    tree: &'a mut BTreeIndex,
    page: Option<PageId>,
    pos: usize,
    start: Key,
    end: Key,
    inclusive: bool,
}

impl<'a> RangeScan<'a> {
    pub(crate) fn new(
        tree: &'a mut BTreeIndex,
        page: Option<PageId>,
        pos: usize,
        start: Key,
        end: Key,
        inclusive: bool,
    ) -> Self {
        Self {
            tree,
            page,
            pos,
            start,
            end,
            inclusive,
        }
    }

    /// Advances to the next entry in range.
    ///
    /// Returns `Ok(None)` once the scan is exhausted; the only error is a
    /// decompression failure while materializing a leaf.
    pub fn next_entry(&mut self) -> BirchResult<Option<(Key, Value)>> {
        loop {
            let Some(id) = self.page else {
                return Ok(None);
            };
            self.tree.materialize(id)?;
            let page = self.tree.page(id);

            if self.pos >= page.entries.len() {
                self.page = page.next_leaf;
                self.pos = 0;
                continue;
            }

            let entry = &page.entries[self.pos];
            if entry.key > self.end || (!self.inclusive && entry.key == self.end) {
                self.page = None;
                return Ok(None);
            }
            self.pos += 1;

            // The landing leaf may start before the range
            if entry.key < self.start || (!self.inclusive && entry.key == self.start) {
                continue;
            }
            return Ok(Some((entry.key.clone(), entry.value.clone())));
        }
    }
}

impl Iterator for RangeScan<'_> {
    type Item = BirchResult<(Key, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}
