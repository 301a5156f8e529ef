//! Resource limits applied to untrusted signatures and payloads.

use serde::{Deserialize, Serialize};

/// Bounds checked by the parser and decoders before doing work proportional to
/// attacker-controlled sizes.
///
/// Hosts usually embed this in their own configuration file:
///
/// ```
/// let limits: oasis_abi::config::Limits =
///     serde_json::from_str(r#"{ "max_depth": 16 }"#).unwrap();
/// assert_eq!(limits.max_depth, 16);
/// assert_eq!(limits.max_signature_len, 2_000);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Longest type signature the parser accepts, in bytes.
    pub max_signature_len: usize,

    /// Deepest nesting of tuples and array suffixes in a type, or of lists in RLP.
    pub max_depth: usize,

    /// Most values a single ABI decode may produce.
    pub max_decoded_values: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_signature_len: 2_000,
            max_depth: 64,
            max_decoded_values: 1 << 20,
        }
    }
}
