//! Child engine configuration.

use serde::{Deserialize, Serialize};

/// Default nesting limit for copied tables
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Options used when creating a bridge.
///
/// Deserializable so front ends can read it from a config file; missing
/// fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeOptions {
    /// Load the standard library into the child engine
    pub open_libs: bool,
    /// Upper bound on child engine memory in bytes (None = unlimited)
    pub memory_limit: Option<usize>,
    /// Maximum table nesting accepted when copying values
    pub max_depth: usize,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            open_libs: true,
            memory_limit: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl BridgeOptions {
    /// Options with the standard library switched on or off
    pub fn with_libs(open_libs: bool) -> Self {
        Self {
            open_libs,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = BridgeOptions::default();
        assert!(options.open_libs);
        assert_eq!(options.memory_limit, None);
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);

        assert!(!BridgeOptions::with_libs(false).open_libs);
    }
}
