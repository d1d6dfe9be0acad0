// src/dedupe.rs
use std::collections::HashSet;

/// Certificate ids already handled during this process lifetime, per target.
///
/// A certificate can carry names for several targets, so the same id is
/// processed once for each target that returns it. Not persisted: after a
/// restart the seen-domain store is what prevents repeat alerts.
#[derive(Debug, Default)]
pub struct ProcessedCertIds {
    inner: HashSet<(String, String)>,
}

impl ProcessedCertIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this id has not been processed for `target` before
    /// (and records it)
    pub fn should_process(&mut self, target: &str, id: &str) -> bool {
        self.inner.insert((target.to_string(), id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_by_id() {
        let mut processed = ProcessedCertIds::new();

        assert!(processed.should_process("example.com", "12345"));
        assert!(!processed.should_process("example.com", "12345"));
        assert!(processed.should_process("example.com", "67890"));
        assert_eq!(processed.len(), 2);
    }

    #[test]
    fn test_same_id_once_per_target() {
        let mut processed = ProcessedCertIds::new();

        assert!(processed.should_process("foo.com", "77"));
        assert!(processed.should_process("bar.com", "77"));
        assert!(!processed.should_process("foo.com", "77"));
        assert!(!processed.should_process("bar.com", "77"));
        assert_eq!(processed.len(), 2);
    }

    #[test]
    fn test_fresh_set_is_empty() {
        let processed = ProcessedCertIds::new();
        assert!(processed.is_empty());
    }
}
