//! Type system for the index engine
//!
//! - Key: totally ordered scalar used for routing and comparison
//! - Value: opaque payload carried alongside a key
//! - KeyValue: the entry type stored in leaf pages

pub mod key;
pub mod value;

pub use key::{Key, KeyValue};
pub use value::Value;
