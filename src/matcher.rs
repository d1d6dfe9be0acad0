// src/matcher.rs
//! Candidate-name normalization and target matching

use serde::Deserialize;

/// How a candidate's suffix must line up with the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Plain string suffix. `notexample.com` matches `example.com`.
    #[default]
    Suffix,
    /// Suffix must start on a label boundary (`.`).
    Label,
}

/// Matches certificate subject names against a target domain
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainMatcher {
    mode: MatchMode,
}

impl DomainMatcher {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Lowercase, trim, and strip one leading `*.`
    pub fn normalize(candidate: &str) -> String {
        let lower = candidate.trim().to_lowercase();
        match lower.strip_prefix("*.") {
            Some(rest) => rest.to_string(),
            None => lower,
        }
    }

    /// Check whether `candidate` falls under `target` (exact or suffix).
    ///
    /// `target` is expected to be normalized already (see [`crate::targets`]).
    pub fn matches(&self, candidate: &str, target: &str) -> bool {
        let name = Self::normalize(candidate);
        self.matches_normalized(&name, target)
    }

    /// Same as [`matches`](Self::matches) for a name that went through
    /// [`normalize`](Self::normalize) already
    pub fn matches_normalized(&self, name: &str, target: &str) -> bool {
        if name.is_empty() || target.is_empty() {
            return false;
        }

        if name == target {
            return true;
        }

        match self.mode {
            MatchMode::Suffix => name.ends_with(target),
            MatchMode::Label => name
                .strip_suffix(target)
                .is_some_and(|head| head.ends_with('.')),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(DomainMatcher::normalize("*.Example.COM"), "example.com");
        assert_eq!(DomainMatcher::normalize("  api.example.com \r"), "api.example.com");
        // Only one wildcard label is stripped
        assert_eq!(DomainMatcher::normalize("*.*.example.com"), "*.example.com");
        assert_eq!(DomainMatcher::normalize("example.com"), "example.com");
    }

    #[test]
    fn test_subdomain_match() {
        let matcher = DomainMatcher::default();

        assert!(matcher.matches("api.example.com", "example.com"));
        assert!(matcher.matches("deep.sub.example.com", "example.com"));
        assert!(matcher.matches("*.example.com", "example.com"));
    }

    #[test]
    fn test_exact_match() {
        let matcher = DomainMatcher::default();

        assert!(matcher.matches("example.com", "example.com"));
        assert!(matcher.matches("EXAMPLE.COM", "example.com"));
    }

    #[test]
    fn test_no_match() {
        let matcher = DomainMatcher::default();

        assert!(!matcher.matches("example.org", "example.com"));
        assert!(!matcher.matches("example.com.evil.org", "example.com"));
        assert!(!matcher.matches("", "example.com"));
    }

    #[test]
    fn test_literal_suffix_false_positive() {
        // Known false positive of the default mode: the suffix is not
        // required to sit on a label boundary.
        let matcher = DomainMatcher::new(MatchMode::Suffix);
        assert!(matcher.matches("notexample.com", "example.com"));
    }

    #[test]
    fn test_label_mode_rejects_partial_label() {
        let matcher = DomainMatcher::new(MatchMode::Label);

        assert!(!matcher.matches("notexample.com", "example.com"));
        assert!(matcher.matches("api.example.com", "example.com"));
        assert!(matcher.matches("*.example.com", "example.com"));
        assert!(matcher.matches("example.com", "example.com"));
        assert!(!matcher.matches("example.org", "example.com"));
    }

    #[test]
    fn test_match_mode_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: MatchMode,
        }

        let w: Wrapper = toml::from_str("mode = \"label\"").unwrap();
        assert_eq!(w.mode, MatchMode::Label);

        let w: Wrapper = toml::from_str("mode = \"suffix\"").unwrap();
        assert_eq!(w.mode, MatchMode::Suffix);
    }
}
