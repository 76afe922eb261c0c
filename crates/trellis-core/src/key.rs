//! Registry keys
//!
//! A [`RefKey`] pairs a domain's scaffold kind with a string identity.
//! Kinds are a closed enum per domain, so lookups are checked at compile
//! time instead of relying on runtime type tags.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Closed set of scaffold kinds for one domain
///
/// # Example
/// ```rust
/// use trellis_core::ScaffoldKind;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum CanvasKind {
///     Layer,
///     Shape,
/// }
///
/// impl ScaffoldKind for CanvasKind {
///     fn as_str(&self) -> &'static str {
///         match self {
///             Self::Layer => "layer",
///             Self::Shape => "shape",
///         }
///     }
/// }
///
/// assert_eq!(CanvasKind::Layer.as_str(), "layer");
/// ```
pub trait ScaffoldKind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Stable lowercase tag used when rendering keys
    fn as_str(&self) -> &'static str;
}

/// Key into a registry: `(kind, name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefKey<K> {
    kind: K,
    name: Arc<str>,
}

impl<K: ScaffoldKind> RefKey<K> {
    /// Create key
    #[inline]
    pub fn new(kind: K, name: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Get kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> K {
        self.kind
    }

    /// Get name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<K: ScaffoldKind> fmt::Display for RefKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Job,
        Stage,
    }

    impl ScaffoldKind for Kind {
        fn as_str(&self) -> &'static str {
            match self {
                Self::Job => "job",
                Self::Stage => "stage",
            }
        }
    }

    #[test]
    fn key_display() {
        let key = RefKey::new(Kind::Job, "build");
        assert_eq!(key.to_string(), "job/build");
        assert_eq!(key.name(), "build");
        assert_eq!(key.kind(), Kind::Job);
    }

    #[test]
    fn kind_separates_same_name() {
        let mut keys = HashSet::new();
        keys.insert(RefKey::new(Kind::Job, "deploy"));
        keys.insert(RefKey::new(Kind::Stage, "deploy"));
        keys.insert(RefKey::new(Kind::Job, "deploy"));
        assert_eq!(keys.len(), 2);
    }
}
