//! birch - In-memory PostgreSQL-style B-tree index engine
//!
//! An ordered multimap index with high fanout, duplicate-key support,
//! sibling-linked leaves for range scans, and content-aware page
//! compression. Pages classify their payloads and pick the best of five
//! reversible strategies (prefix, dictionary, delta, run-length, deflate);
//! anything the tree touches rematerializes transparently.
//!
//! ```
//! use birch::{BTreeIndex, Key, Value};
//!
//! # fn main() -> birch::BirchResult<()> {
//! let mut index = BTreeIndex::new(256)?;
//! index.insert(Key::text("user_001"), Value::text("alice"))?;
//! index.insert(Key::text("user_002"), Value::text("bob"))?;
//!
//! assert_eq!(index.search(&Key::text("user_001"))?, vec![Value::text("alice")]);
//!
//! let report = index.compress_all_pages();
//! assert_eq!(report.attempts, 1);
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod compression;
pub mod config;
pub mod index;
pub mod types;

// Re-export the error surface for convenience
pub use common::error::{BirchError, BirchResult};

// Re-export the type system for convenience
pub use types::{Key, KeyValue, Value};

// Re-export the index surface for convenience
pub use config::BTreeConfig;
pub use index::{BTreeIndex, CompressionReport, RangeScan, TreeStats};

// Re-export the compression layer for callers that drive it directly
pub use compression::{
    CompressionManager, CompressionStats, EncodedBlock, StrategyKind,
};
