//! PostgreSQL-style B-tree
//!
//! High-fanout B+ tree: all entries live in leaf pages, internal pages hold
//! separator keys only, and leaves chain left to right for range scans.
//! Duplicate keys are allowed; equal keys keep insertion order within the
//! sorted run. Pages compress individually through the compression manager
//! and rematerialize transparently the moment an operation touches them.

use crate::common::error::{BirchError, BirchResult};
use crate::compression::CompressionManager;
use crate::config::BTreeConfig;
use crate::index::page::{Page, PageId};
use crate::index::scan::RangeScan;
use crate::index::stats::{CompressionReport, TreeStats};
use crate::invalid_arg;
use crate::types::{Key, KeyValue, Value};

/// The index: an ordered multimap from keys to opaque values.
pub struct BTreeIndex {
    config: BTreeConfig,
    pages: Vec<Option<Page>>,
    free: Vec<usize>,
    root: Option<PageId>,
    height: usize,
    total_keys: usize,
    node_count: usize,
    manager: CompressionManager,
}

/// State accumulated while walking the tree for invariant checks
#[derive(Default)]
struct ValidationWalk {
    leaf_depth: Option<usize>,
    leaves: Vec<PageId>,
    keys_seen: usize,
}

impl BTreeIndex {
    /// Creates an index with the given order and compression enabled
    pub fn new(order: usize) -> BirchResult<Self> {
        Self::with_config(BTreeConfig::with_order(order))
    }

    /// Creates an index from a full configuration
    pub fn with_config(config: BTreeConfig) -> BirchResult<Self> {
        config.validate()?;
        let manager = CompressionManager::new(config.compression());
        Ok(Self {
            config,
            pages: Vec::new(),
            free: Vec::new(),
            root: None,
            height: 0,
            total_keys: 0,
            node_count: 0,
            manager,
        })
    }

    pub fn order(&self) -> usize {
        self.config.order
    }

    /// Number of entries in the index, duplicates counted
    pub fn len(&self) -> usize {
        self.total_keys
    }

    pub fn is_empty(&self) -> bool {
        self.total_keys == 0
    }

    /// Number of levels; 1 for a lone leaf root, 0 when empty
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Inserts an entry. Duplicate keys are permitted and keep insertion
    /// order among themselves.
    pub fn insert(&mut self, key: Key, value: Value) -> BirchResult<()> {
        let root = match self.root {
            Some(root) => root,
            None => {
                let root = self.alloc(Page::new_leaf());
                self.root = Some(root);
                self.height = 1;
                root
            }
        };

        let leaf = self.descend_to_insert_leaf(root, &key)?;
        {
            let page = self.page_mut(leaf);
            // Upper bound of the equal-key run: duplicates append after
            // their elders, which is what keeps deletion order stable
            let pos = page.entries.partition_point(|e| e.key <= key);
            page.entries.insert(pos, KeyValue::new(key, value));
        }
        self.total_keys += 1;

        let mut overflowed = leaf;
        while self.page(overflowed).key_count() > self.max_keys() {
            overflowed = self.split(overflowed)?;
        }
        Ok(())
    }

    /// Returns every value stored under the key, in insertion order.
    pub fn search(&mut self, key: &Key) -> BirchResult<Vec<Value>> {
        let Some(root) = self.root else {
            return Ok(Vec::new());
        };

        let mut id = self.descend_to_first_leaf(root, key)?;
        let mut values = Vec::new();
        loop {
            self.materialize(id)?;
            let page = self.page(id);
            let start = page.entries.partition_point(|e| e.key < *key);

            let mut exceeded = false;
            for entry in &page.entries[start..] {
                if entry.key == *key {
                    values.push(entry.value.clone());
                } else {
                    exceeded = true;
                    break;
                }
            }

            // Duplicates may continue on the next leaf
            if exceeded {
                break;
            }
            match page.next_leaf {
                Some(next) => id = next,
                None => break,
            }
        }
        Ok(values)
    }

    /// Removes the first entry matching the key (and value, when given).
    ///
    /// Returns `false` without mutating anything when no entry matches.
    pub fn delete(&mut self, key: &Key, value: Option<&Value>) -> BirchResult<bool> {
        let Some(root) = self.root else {
            return Ok(false);
        };

        let mut id = self.descend_to_first_leaf(root, key)?;
        let target = loop {
            self.materialize(id)?;
            let page = self.page(id);
            let start = page.entries.partition_point(|e| e.key < *key);

            let mut found = None;
            let mut exceeded = false;
            for (i, entry) in page.entries[start..].iter().enumerate() {
                if entry.key != *key {
                    exceeded = true;
                    break;
                }
                if value.map_or(true, |v| entry.value == *v) {
                    found = Some(start + i);
                    break;
                }
            }

            if let Some(idx) = found {
                break Some((id, idx));
            }
            if exceeded {
                break None;
            }
            match page.next_leaf {
                Some(next) => id = next,
                None => break None,
            }
        };

        let Some((leaf, idx)) = target else {
            return Ok(false);
        };
        self.page_mut(leaf).entries.remove(idx);
        self.total_keys -= 1;
        self.rebalance(leaf)?;
        Ok(true)
    }

    /// Opens a cursor over `[start, end]` (or the open interval when
    /// `inclusive` is false). Fails when `start > end`.
    pub fn range_query(
        &mut self,
        start: &Key,
        end: &Key,
        inclusive: bool,
    ) -> BirchResult<RangeScan<'_>> {
        if start > end {
            return Err(invalid_arg!("range start {} exceeds end {}", start, end));
        }

        let Some(root) = self.root else {
            return Ok(RangeScan::new(
                self,
                None,
                0,
                start.clone(),
                end.clone(),
                inclusive,
            ));
        };

        let leaf = self.descend_to_first_leaf(root, start)?;
        let pos = self
            .page(leaf)
            .entries
            .partition_point(|e| e.key < *start);
        Ok(RangeScan::new(
            self,
            Some(leaf),
            pos,
            start.clone(),
            end.clone(),
            inclusive,
        ))
    }

    /// Every entry in key order; equivalent to an unbounded range scan.
    pub fn scan_all(&mut self) -> BirchResult<Vec<(Key, Value)>> {
        let Some(root) = self.root else {
            return Ok(Vec::new());
        };

        let mut id = root;
        loop {
            self.materialize(id)?;
            let page = self.page(id);
            if page.is_leaf {
                break;
            }
            id = page.children[0];
        }

        let mut entries = Vec::with_capacity(self.total_keys);
        let mut current = Some(id);
        while let Some(id) = current {
            self.materialize(id)?;
            let page = self.page(id);
            for entry in &page.entries {
                entries.push((entry.key.clone(), entry.value.clone()));
            }
            current = page.next_leaf;
        }
        Ok(entries)
    }

    /// Compresses every materialized page that the manager can beat the
    /// acceptance gates on. Already-compressed pages are skipped, so a
    /// second sweep is a no-op.
    pub fn compress_all_pages(&mut self) -> CompressionReport {
        let mut report = CompressionReport::default();
        if !self.config.enable_compression {
            return report;
        }

        let manager = &mut self.manager;
        for slot in self.pages.iter_mut() {
            let Some(page) = slot else { continue };
            if page.is_compressed() {
                continue;
            }
            report.attempts += 1;

            if page.compress(manager) {
                report.successes += 1;
                if let Some(compressed) = &page.compressed {
                    report.bytes_saved += compressed.bytes_saved() as u64;
                    for kind in compressed.strategies() {
                        *report.by_strategy.entry(kind).or_default() += 1;
                    }
                }
            } else {
                report.failures += 1;
            }
        }
        report
    }

    /// Rematerializes every page and resets the compression counters.
    pub fn decompress_all_pages(&mut self) -> BirchResult<()> {
        let manager = &self.manager;
        for slot in self.pages.iter_mut() {
            if let Some(page) = slot {
                page.decompress(manager)
                    .map_err(|e| BirchError::Decompression(e.to_string()))?;
            }
        }
        self.manager.reset_stats();
        Ok(())
    }

    /// Tree shape and compression effectiveness in one snapshot
    pub fn get_statistics(&self) -> TreeStats {
        let mut fill_sum = 0.0;
        let mut pages = 0usize;
        for slot in &self.pages {
            if let Some(page) = slot {
                fill_sum += page.fill_ratio(self.config.order);
                pages += 1;
            }
        }

        TreeStats {
            height: self.height,
            node_count: self.node_count,
            total_keys: self.total_keys,
            avg_fill_ratio: if pages == 0 { 0.0 } else { fill_sum / pages as f64 },
            compression_ratio: self.manager.stats().global_ratio(),
        }
    }

    /// The compression manager's full counters
    pub fn get_detailed_compression_stats(&self) -> crate::compression::CompressionStats {
        self.manager.stats().clone()
    }

    /// Checks the structural invariants: minimum occupancy, uniform leaf
    /// depth, per-page and cross-page key ordering, child/parent link
    /// agreement, and the leaf chain. Compressed pages are checked by
    /// counts only.
    pub fn validate(&self) -> BirchResult<()> {
        let Some(root) = self.root else {
            if self.total_keys != 0 || self.node_count != 0 {
                return Err(BirchError::InvariantViolation(format!(
                    "empty tree reports {} keys across {} pages",
                    self.total_keys, self.node_count
                )));
            }
            return Ok(());
        };

        if self.page(root).parent.is_some() {
            return Err(BirchError::InvariantViolation(
                "root page has a parent".to_string(),
            ));
        }

        let mut walk = ValidationWalk::default();
        self.validate_page(root, 0, None, None, &mut walk)?;

        if let Some(depth) = walk.leaf_depth {
            if depth + 1 != self.height {
                return Err(BirchError::InvariantViolation(format!(
                    "leaves sit at depth {}, tree claims height {}",
                    depth, self.height
                )));
            }
        }

        for (i, leaf) in walk.leaves.iter().enumerate() {
            let expected = walk.leaves.get(i + 1).copied();
            if self.page(*leaf).next_leaf != expected {
                return Err(BirchError::InvariantViolation(format!(
                    "leaf chain breaks at page {:?}",
                    leaf
                )));
            }
        }

        if walk.keys_seen != self.total_keys {
            return Err(BirchError::InvariantViolation(format!(
                "leaves hold {} entries, tree claims {}",
                walk.keys_seen, self.total_keys
            )));
        }
        Ok(())
    }

    fn validate_page(
        &self,
        id: PageId,
        depth: usize,
        lower: Option<&Key>,
        upper: Option<&Key>,
        walk: &mut ValidationWalk,
    ) -> BirchResult<()> {
        let page = self.page(id);
        let is_root = Some(id) == self.root;

        if !is_root && page.key_count() < self.min_keys() {
            return Err(BirchError::InvariantViolation(format!(
                "page {:?} holds {} keys, minimum is {}",
                id,
                page.key_count(),
                self.min_keys()
            )));
        }
        if page.key_count() > self.max_keys() {
            return Err(BirchError::InvariantViolation(format!(
                "page {:?} holds {} keys, capacity is {}",
                id,
                page.key_count(),
                self.max_keys()
            )));
        }
        if is_root && !page.is_leaf && page.key_count() == 0 {
            return Err(BirchError::InvariantViolation(
                "internal root has no separators".to_string(),
            ));
        }

        if page.is_leaf {
            if !page.children.is_empty() {
                return Err(BirchError::InvariantViolation(format!(
                    "leaf page {:?} has children",
                    id
                )));
            }
            match walk.leaf_depth {
                None => walk.leaf_depth = Some(depth),
                Some(d) if d != depth => {
                    return Err(BirchError::InvariantViolation(format!(
                        "leaf page {:?} at depth {}, others at {}",
                        id, depth, d
                    )))
                }
                _ => {}
            }
            walk.leaves.push(id);
            walk.keys_seen += page.key_count();

            if !page.is_compressed() {
                for pair in page.entries.windows(2) {
                    if pair[0].key > pair[1].key {
                        return Err(BirchError::InvariantViolation(format!(
                            "leaf page {:?} is not sorted",
                            id
                        )));
                    }
                }
                for entry in &page.entries {
                    if lower.is_some_and(|lo| entry.key < *lo)
                        || upper.is_some_and(|hi| entry.key > *hi)
                    {
                        return Err(BirchError::InvariantViolation(format!(
                            "leaf page {:?} holds key {} outside its separator bounds",
                            id, entry.key
                        )));
                    }
                }
            }
        } else {
            if page.next_leaf.is_some() {
                return Err(BirchError::InvariantViolation(format!(
                    "internal page {:?} carries a leaf link",
                    id
                )));
            }
            if page.children.len() != page.key_count() + 1 {
                return Err(BirchError::InvariantViolation(format!(
                    "internal page {:?} has {} children for {} separators",
                    id,
                    page.children.len(),
                    page.key_count()
                )));
            }
            if !page.is_compressed() {
                for pair in page.separators.windows(2) {
                    if pair[0] > pair[1] {
                        return Err(BirchError::InvariantViolation(format!(
                            "internal page {:?} separators are not sorted",
                            id
                        )));
                    }
                }
            }

            for (i, child) in page.children.iter().enumerate() {
                if self.page(*child).parent != Some(id) {
                    return Err(BirchError::InvariantViolation(format!(
                        "page {:?} does not point back to its parent {:?}",
                        child, id
                    )));
                }
                let (lo, hi) = if page.is_compressed() {
                    (None, None)
                } else {
                    let lo = if i == 0 {
                        lower
                    } else {
                        Some(&page.separators[i - 1])
                    };
                    let hi = if i == page.separators.len() {
                        upper
                    } else {
                        Some(&page.separators[i])
                    };
                    (lo, hi)
                };
                self.validate_page(*child, depth + 1, lo, hi, walk)?;
            }
        }
        Ok(())
    }

    // --- page arena ---

    pub(crate) fn page(&self, id: PageId) -> &Page {
        match self.pages[id.0].as_ref() {
            Some(page) => page,
            None => unreachable!("dangling page id"),
        }
    }

    fn page_mut(&mut self, id: PageId) -> &mut Page {
        match self.pages[id.0].as_mut() {
            Some(page) => page,
            None => unreachable!("dangling page id"),
        }
    }

    fn alloc(&mut self, page: Page) -> PageId {
        self.node_count += 1;
        match self.free.pop() {
            Some(slot) => {
                self.pages[slot] = Some(page);
                PageId(slot)
            }
            None => {
                self.pages.push(Some(page));
                PageId(self.pages.len() - 1)
            }
        }
    }

    fn free_page(&mut self, id: PageId) {
        self.pages[id.0] = None;
        self.free.push(id.0);
        self.node_count -= 1;
    }

    /// Ensures the page is materialized before it is read or mutated
    pub(crate) fn materialize(&mut self, id: PageId) -> BirchResult<()> {
        let manager = &self.manager;
        match self.pages[id.0].as_mut() {
            Some(page) => page
                .decompress(manager)
                .map_err(|e| BirchError::Decompression(e.to_string())),
            None => unreachable!("dangling page id"),
        }
    }

    // --- descent ---

    /// Descends right-biased: a key equal to a separator routes into the
    /// right subtree, where new duplicates belong.
    fn descend_to_insert_leaf(&mut self, from: PageId, key: &Key) -> BirchResult<PageId> {
        let mut id = from;
        loop {
            self.materialize(id)?;
            let page = self.page(id);
            if page.is_leaf {
                return Ok(id);
            }
            let child = page.separators.partition_point(|sep| sep <= key);
            id = page.children[child];
        }
    }

    /// Descends left-biased: a key equal to a separator routes into the
    /// left subtree, which may hold earlier duplicates.
    fn descend_to_first_leaf(&mut self, from: PageId, key: &Key) -> BirchResult<PageId> {
        let mut id = from;
        loop {
            self.materialize(id)?;
            let page = self.page(id);
            if page.is_leaf {
                return Ok(id);
            }
            let child = page.separators.partition_point(|sep| sep < key);
            id = page.children[child];
        }
    }

    // --- rebalancing ---

    fn min_keys(&self) -> usize {
        (self.config.order + 1) / 2 - 1
    }

    fn max_keys(&self) -> usize {
        self.config.order - 1
    }

    fn child_index(&self, parent: PageId, child: PageId) -> usize {
        match self.page(parent).children.iter().position(|c| *c == child) {
            Some(idx) => idx,
            None => unreachable!("page not registered in its parent"),
        }
    }

    /// Splits an oversized page, pushing a separator into the parent;
    /// returns the parent so the caller can check it for overflow in turn.
    fn split(&mut self, id: PageId) -> BirchResult<PageId> {
        let parent_id = match self.page(id).parent {
            Some(parent) => {
                self.materialize(parent)?;
                parent
            }
            None => {
                // Root split: grow the tree by one level
                let parent = self.alloc(Page::new_internal());
                self.page_mut(parent).children.push(id);
                self.page_mut(id).parent = Some(parent);
                self.root = Some(parent);
                self.height += 1;
                parent
            }
        };
        let child_idx = self.child_index(parent_id, id);

        if self.page(id).is_leaf {
            let (right_entries, old_next) = {
                let page = self.page_mut(id);
                let mid = page.entries.len() / 2;
                (page.entries.split_off(mid), page.next_leaf)
            };
            // The separator is the first key of the new right page, which
            // keeps it on the right of the separator it names
            let separator = right_entries[0].key.clone();

            let right = self.alloc(Page::new_leaf());
            {
                let right_page = self.page_mut(right);
                right_page.entries = right_entries;
                right_page.parent = Some(parent_id);
                right_page.next_leaf = old_next;
            }
            self.page_mut(id).next_leaf = Some(right);

            let parent = self.page_mut(parent_id);
            parent.separators.insert(child_idx, separator);
            parent.children.insert(child_idx + 1, right);
        } else {
            let (promoted, right_separators, right_children) = {
                let page = self.page_mut(id);
                let mid = page.separators.len() / 2;
                let right_separators = page.separators.split_off(mid + 1);
                let promoted = match page.separators.pop() {
                    Some(key) => key,
                    None => unreachable!("internal split on page without separators"),
                };
                let right_children = page.children.split_off(mid + 1);
                (promoted, right_separators, right_children)
            };

            let right = self.alloc(Page::new_internal());
            {
                let right_page = self.page_mut(right);
                right_page.separators = right_separators;
                right_page.children = right_children;
                right_page.parent = Some(parent_id);
            }
            for i in 0..self.page(right).children.len() {
                let child = self.page(right).children[i];
                self.page_mut(child).parent = Some(right);
            }

            let parent = self.page_mut(parent_id);
            parent.separators.insert(child_idx, promoted);
            parent.children.insert(child_idx + 1, right);
        }
        Ok(parent_id)
    }

    /// Restores minimum occupancy after a deletion: borrow from the left
    /// sibling, else the right, else merge; recurses when the merge leaves
    /// the parent underfull.
    fn rebalance(&mut self, id: PageId) -> BirchResult<()> {
        if Some(id) == self.root {
            let root = self.page(id);
            if root.is_leaf {
                if root.entries.is_empty() {
                    // Last entry gone: the tree is empty again
                    self.free_page(id);
                    self.root = None;
                    self.height = 0;
                }
            } else if root.separators.is_empty() {
                // Root shrink: the sole child becomes the new root
                let child = root.children[0];
                self.free_page(id);
                self.page_mut(child).parent = None;
                self.root = Some(child);
                self.height -= 1;
            }
            return Ok(());
        }

        if self.page(id).key_count() >= self.min_keys() {
            return Ok(());
        }

        let parent_id = match self.page(id).parent {
            Some(parent) => parent,
            None => unreachable!("non-root page without a parent"),
        };
        self.materialize(parent_id)?;
        let idx = self.child_index(parent_id, id);

        if idx > 0 {
            let left = self.page(parent_id).children[idx - 1];
            self.materialize(left)?;
            if self.page(left).key_count() > self.min_keys() {
                self.borrow_from_left(id, left, parent_id, idx - 1);
                return Ok(());
            }
        }
        if idx + 1 < self.page(parent_id).children.len() {
            let right = self.page(parent_id).children[idx + 1];
            self.materialize(right)?;
            if self.page(right).key_count() > self.min_keys() {
                self.borrow_from_right(id, right, parent_id, idx);
                return Ok(());
            }
        }

        if idx > 0 {
            let left = self.page(parent_id).children[idx - 1];
            self.merge(left, id, parent_id, idx - 1);
        } else {
            let right = self.page(parent_id).children[idx + 1];
            self.merge(id, right, parent_id, idx);
        }
        self.rebalance(parent_id)
    }

    fn borrow_from_left(&mut self, node: PageId, left: PageId, parent: PageId, sep_idx: usize) {
        if self.page(node).is_leaf {
            let borrowed = match self.page_mut(left).entries.pop() {
                Some(entry) => entry,
                None => unreachable!("left sibling cannot spare an entry"),
            };
            let separator = borrowed.key.clone();
            self.page_mut(node).entries.insert(0, borrowed);
            self.page_mut(parent).separators[sep_idx] = separator;
        } else {
            let (moved_key, moved_child) = {
                let left_page = self.page_mut(left);
                match (left_page.separators.pop(), left_page.children.pop()) {
                    (Some(key), Some(child)) => (key, child),
                    _ => unreachable!("left sibling cannot spare a separator"),
                }
            };
            // Rotate through the parent: its separator drops into the node,
            // the sibling's last key replaces it
            let old_separator =
                std::mem::replace(&mut self.page_mut(parent).separators[sep_idx], moved_key);
            {
                let node_page = self.page_mut(node);
                node_page.separators.insert(0, old_separator);
                node_page.children.insert(0, moved_child);
            }
            self.page_mut(moved_child).parent = Some(node);
        }
    }

    fn borrow_from_right(&mut self, node: PageId, right: PageId, parent: PageId, sep_idx: usize) {
        if self.page(node).is_leaf {
            let borrowed = self.page_mut(right).entries.remove(0);
            self.page_mut(node).entries.push(borrowed);
            let separator = self.page(right).entries[0].key.clone();
            self.page_mut(parent).separators[sep_idx] = separator;
        } else {
            let moved_key = self.page_mut(right).separators.remove(0);
            let moved_child = self.page_mut(right).children.remove(0);
            let old_separator =
                std::mem::replace(&mut self.page_mut(parent).separators[sep_idx], moved_key);
            {
                let node_page = self.page_mut(node);
                node_page.separators.push(old_separator);
                node_page.children.push(moved_child);
            }
            self.page_mut(moved_child).parent = Some(node);
        }
    }

    /// Concatenates `right` into `left`, dropping the separator between
    /// them from the parent and freeing the right page.
    fn merge(&mut self, left: PageId, right: PageId, parent: PageId, sep_idx: usize) {
        let separator = self.page_mut(parent).separators.remove(sep_idx);
        self.page_mut(parent).children.remove(sep_idx + 1);

        if self.page(left).is_leaf {
            let (mut entries, next) = {
                let right_page = self.page_mut(right);
                (std::mem::take(&mut right_page.entries), right_page.next_leaf)
            };
            // Leaf merges drop the separator; it was only a routing copy
            let left_page = self.page_mut(left);
            left_page.entries.append(&mut entries);
            left_page.next_leaf = next;
        } else {
            let (mut separators, children) = {
                let right_page = self.page_mut(right);
                (
                    std::mem::take(&mut right_page.separators),
                    std::mem::take(&mut right_page.children),
                )
            };
            {
                let left_page = self.page_mut(left);
                left_page.separators.push(separator);
                left_page.separators.append(&mut separators);
                left_page.children.extend(children.iter().copied());
            }
            for child in children {
                self.page_mut(child).parent = Some(left);
            }
        }
        self.free_page(right);
    }
}
