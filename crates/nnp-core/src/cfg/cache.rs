//! Parse cache for predicate text.

use super::parser::Predicate;
use super::CfgError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Cache of parsed predicates keyed by trimmed source text.
///
/// Entries are never evicted. Repeated lookups of the same text return the
/// same `Arc`. Parse failures are not cached.
#[derive(Debug, Default)]
pub struct PredicateCache {
    entries: Mutex<HashMap<String, Arc<Predicate>>>,
}

impl PredicateCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    ///
    /// Grows with every distinct predicate text seen by the process.
    #[must_use]
    pub fn global() -> Arc<PredicateCache> {
        static GLOBAL: OnceLock<Arc<PredicateCache>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(PredicateCache::new())))
    }

    /// Parse `source`, reusing a cached AST when the trimmed text was seen before.
    ///
    /// # Errors
    /// Returns `CfgError::InvalidPredicate` if the text does not parse.
    pub fn parse(&self, source: &str) -> Result<Arc<Predicate>, CfgError> {
        let key = source.trim();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(predicate) = entries.get(key) {
            return Ok(Arc::clone(predicate));
        }
        let predicate = Arc::new(Predicate::parse(key)?);
        entries.insert(key.to_string(), Arc::clone(&predicate));
        Ok(predicate)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_text_same_instance() {
        let cache = PredicateCache::new();
        let a = cache.parse("prod or nodepy > 2.0.0").unwrap();
        let b = cache.parse("  prod or nodepy > 2.0.0 ").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keyed_on_text_not_meaning() {
        let cache = PredicateCache::new();
        let a = cache.parse("dev").unwrap();
        let b = cache.parse("(dev)").unwrap();
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failures_not_cached() {
        let cache = PredicateCache::new();
        assert!(cache.parse("(a and b) or c").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = PredicateCache::new();
        let a = cache.parse("dev").unwrap();
        cache.clear();
        let b = cache.parse("dev").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_global_is_shared() {
        let a = PredicateCache::global().parse("globalcachetest").unwrap();
        let b = PredicateCache::global().parse("globalcachetest").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&PredicateCache::global(), &PredicateCache::global()));
    }
}
