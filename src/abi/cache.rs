use std::{collections::HashMap, sync::Arc};

use log::debug;

use super::ty::TypeDescriptor;
use crate::{config::Limits, errors::AbiError};

/// Caller-owned cache of parsed descriptors keyed by their signature string.
///
/// Descriptors are handed out as `Arc`s so they can be shared across threads once
/// parsed.
#[derive(Default)]
pub struct TypeCache {
    limits: Limits,
    descriptors: HashMap<String, Arc<TypeDescriptor>>,
}

impl TypeCache {
    /// An empty cache parsing with the default [`Limits`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache parsing with the given limits.
    pub fn with_limits(limits: Limits) -> Self {
        TypeCache {
            limits,
            descriptors: HashMap::new(),
        }
    }

    /// Returns the descriptor for `signature`, parsing it on first use.
    pub fn get_or_parse(&mut self, signature: &str) -> Result<Arc<TypeDescriptor>, AbiError> {
        if let Some(desc) = self.descriptors.get(signature) {
            return Ok(Arc::clone(desc));
        }
        debug!("type cache miss for `{}`", signature);
        let desc = Arc::new(TypeDescriptor::parse_with_limits(signature, &self.limits)?);
        self.descriptors
            .insert(signature.to_string(), Arc::clone(&desc));
        Ok(desc)
    }

    /// Number of cached signatures.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Drops every cached descriptor. Outstanding `Arc`s stay valid.
    pub fn clear(&mut self) {
        self.descriptors.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_once() {
        let mut cache = TypeCache::new();
        assert!(cache.is_empty());
        let first = cache.get_or_parse("(uint256,bytes)").unwrap();
        let second = cache.get_or_parse("(uint256,bytes)").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        // keyed by the signature as written, not its canonical form
        let third = cache.get_or_parse("(uint,bytes)").unwrap();
        assert_eq!(first, third);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn errors_are_not_cached() {
        let mut cache = TypeCache::with_limits(Limits {
            max_depth: 1,
            ..Default::default()
        });
        assert!(cache.get_or_parse("uint8[]").is_err());
        assert!(cache.get_or_parse("uint8").is_ok());
        assert_eq!(cache.len(), 1);
    }
}
