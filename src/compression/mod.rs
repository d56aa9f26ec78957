//! Page compression for the index engine
//!
//! Five reversible strategies, each matched to a payload shape:
//!
//! - **Prefix**: shared-prefix elision for string keys (2-5x on key pages)
//! - **Dictionary**: value table + index array for low cardinality (2-50x)
//! - **Delta**: base + differences for sequential integers (5-10x)
//! - **RunLength**: (value, count) pairs for repeated values (10-1000x)
//! - **General**: deflate fallback for large compressible payloads (~2.5x)
//!
//! [`CompressionManager`] fingerprints a payload, estimates each applicable
//! strategy without encoding, picks the best, and verifies the encoded
//! block against the acceptance gates. Payloads nothing fits pass through
//! untouched under the `NONE` sentinel.

pub mod codec;
pub mod delta;
pub mod dictionary;
pub mod general;
pub mod manager;
pub mod prefix;
pub mod rle;
pub mod traits;
pub mod types;

pub use delta::DeltaCompression;
pub use dictionary::DictionaryCompression;
pub use general::GeneralCompression;
pub use manager::{
    CompressionConfig, CompressionManager, CompressionStats, Fingerprint, StrategyCounters,
};
pub use prefix::PrefixCompression;
pub use rle::RunLengthCompression;
pub use traits::{CompressionError, CompressionResult, CompressionStrategy};
pub use types::{BlockMetadata, EncodedBlock, EstimateResult, StrategyKind};
