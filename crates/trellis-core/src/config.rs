//! Resolver configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// How composite children are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concurrency {
    /// Each child is a spawned tokio task (parallel on multi-thread runtimes)
    #[default]
    Spawned,
    /// Children are joined futures on the parent's task (cooperative only)
    Inline,
}

/// Resolver configuration
///
/// ```rust
/// use trellis_core::{Concurrency, ResolverConfig};
///
/// let config = ResolverConfig::from_toml_str(
///     r#"
///     concurrency = "inline"
///     max_depth = 64
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.concurrency, Concurrency::Inline);
/// assert_eq!(config.max_depth, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Child scheduling
    pub concurrency: Concurrency,
    /// Maximum scaffold nesting depth, producers included
    pub max_depth: usize,
}

impl ResolverConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With child scheduling mode
    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// With maximum nesting depth
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse from TOML; absent keys keep their defaults
    ///
    /// # Errors
    /// Returns [`Error::Config`] on malformed TOML or a zero depth limit.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(|e| Error::Config(e.to_string()))?;
        if config.max_depth == 0 {
            return Err(Error::Config("max_depth must be at least 1".to_string()));
        }
        Ok(config)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            concurrency: Concurrency::Spawned,
            max_depth: 512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ResolverConfig::new();
        assert_eq!(config.concurrency, Concurrency::Spawned);
        assert_eq!(config.max_depth, 512);
    }

    #[test]
    fn builder_setters() {
        let config = ResolverConfig::new()
            .with_concurrency(Concurrency::Inline)
            .with_max_depth(8);
        assert_eq!(config.concurrency, Concurrency::Inline);
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ResolverConfig::from_toml_str("max_depth = 16").unwrap();
        assert_eq!(config.concurrency, Concurrency::Spawned);
        assert_eq!(config.max_depth, 16);
    }

    #[test]
    fn rejects_zero_depth_and_bad_mode() {
        assert!(matches!(
            ResolverConfig::from_toml_str("max_depth = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ResolverConfig::from_toml_str("concurrency = \"threads\""),
            Err(Error::Config(_))
        ));
    }
}
