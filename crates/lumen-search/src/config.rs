//! Search engine configuration.

use std::env;

use lumen_core::defaults::{
    ENV_MAX_CONCURRENT_ANALYSES, ENV_SNIPPET_LENGTH, MAX_CONCURRENT_ANALYSES, SNIPPET_LENGTH,
};

/// Tunables for `ImageSearchEngine`.
///
/// # Example
/// ```
/// use lumen_search::SearchConfig;
///
/// let config = SearchConfig::default().with_max_concurrent_analyses(2);
/// assert_eq!(config.max_concurrent_analyses, 2);
/// assert_eq!(config.snippet_length, 120);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Images analyzed at once across all strategies and callers.
    pub max_concurrent_analyses: usize,
    /// Maximum snippet length in characters.
    pub snippet_length: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_analyses: MAX_CONCURRENT_ANALYSES,
            snippet_length: SNIPPET_LENGTH,
        }
    }
}

impl SearchConfig {
    /// Constructs config from environment variables.
    ///
    /// Environment variables:
    /// - `LUMEN_MAX_CONCURRENT_ANALYSES` (default: 4)
    /// - `LUMEN_SNIPPET_LENGTH` (default: 120)
    ///
    /// Unparseable or zero values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_analyses: parse_positive(ENV_MAX_CONCURRENT_ANALYSES)
                .unwrap_or(defaults.max_concurrent_analyses),
            snippet_length: parse_positive(ENV_SNIPPET_LENGTH).unwrap_or(defaults.snippet_length),
        }
    }

    pub fn with_max_concurrent_analyses(mut self, max: usize) -> Self {
        self.max_concurrent_analyses = max.max(1);
        self
    }

    pub fn with_snippet_length(mut self, length: usize) -> Self {
        self.snippet_length = length.max(1);
        self
    }
}

fn parse_positive(var: &str) -> Option<usize> {
    env::var(var)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = SearchConfig::default();
        assert_eq!(config.max_concurrent_analyses, 4);
        assert_eq!(config.snippet_length, 120);
    }

    #[test]
    fn test_builders_reject_zero() {
        let config = SearchConfig::default()
            .with_max_concurrent_analyses(0)
            .with_snippet_length(0);
        assert_eq!(config.max_concurrent_analyses, 1);
        assert_eq!(config.snippet_length, 1);
    }

    #[test]
    fn test_from_env() {
        env::set_var(ENV_MAX_CONCURRENT_ANALYSES, "8");
        env::set_var(ENV_SNIPPET_LENGTH, "not-a-number");
        let config = SearchConfig::from_env();
        env::remove_var(ENV_MAX_CONCURRENT_ANALYSES);
        env::remove_var(ENV_SNIPPET_LENGTH);

        assert_eq!(config.max_concurrent_analyses, 8);
        assert_eq!(config.snippet_length, SNIPPET_LENGTH);
    }
}
