//! Engine configuration

use crate::common::error::BirchResult;
use crate::compression::CompressionConfig;
use crate::invalid_arg;
use serde::{Deserialize, Serialize};

/// Smallest branching factor the rebalancing math supports
pub const MIN_ORDER: usize = 4;

/// Default branching factor, sized for roughly 8KB pages of integer keys
pub const DEFAULT_ORDER: usize = 256;

/// Configuration for a [`crate::index::BTreeIndex`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BTreeConfig {
    /// Maximum number of children per internal page; pages hold up to
    /// `order - 1` entries.
    pub order: usize,

    /// When false, `compress_all_pages` is a no-op and every page stays
    /// materialized.
    pub enable_compression: bool,

    /// Payloads smaller than this skip the general-purpose strategy.
    pub min_payload_for_general: usize,

    /// Estimated ratios (compressed / original) above this reject the
    /// strategy before encoding.
    pub estimate_acceptance: f64,

    /// Actual post-encode ratios at or above this discard the block and fall
    /// back to passthrough.
    pub encode_acceptance: f64,
}

impl Default for BTreeConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
            enable_compression: true,
            min_payload_for_general: 128,
            estimate_acceptance: 0.9,
            encode_acceptance: 0.95,
        }
    }
}

impl BTreeConfig {
    /// Creates a configuration with the given order and defaults elsewhere
    pub fn with_order(order: usize) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> BirchResult<()> {
        if self.order < MIN_ORDER {
            return Err(invalid_arg!(
                "order {} is below the minimum of {}",
                self.order,
                MIN_ORDER
            ));
        }
        if !(0.0..=1.0).contains(&self.estimate_acceptance) {
            return Err(invalid_arg!(
                "estimate acceptance ratio {} is outside [0, 1]",
                self.estimate_acceptance
            ));
        }
        if !(0.0..=1.0).contains(&self.encode_acceptance) {
            return Err(invalid_arg!(
                "encode acceptance ratio {} is outside [0, 1]",
                self.encode_acceptance
            ));
        }
        Ok(())
    }

    /// The slice of this configuration handed to the compression manager
    pub fn compression(&self) -> CompressionConfig {
        CompressionConfig {
            min_payload_for_general: self.min_payload_for_general,
            estimate_acceptance: self.estimate_acceptance,
            encode_acceptance: self.encode_acceptance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BTreeConfig::default();
        assert_eq!(config.order, 256);
        assert!(config.enable_compression);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_order_below_minimum_rejected() {
        let config = BTreeConfig::with_order(3);
        assert!(config.validate().is_err());

        let config = BTreeConfig::with_order(4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_acceptance_ratio_bounds() {
        let config = BTreeConfig {
            estimate_acceptance: 1.5,
            ..BTreeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
