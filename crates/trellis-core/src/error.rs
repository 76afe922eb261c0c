//! Error types for the resolution engine
//!
//! Provides error handling for:
//! - Builder finalization (missing required fields)
//! - Reference lookup (dangling and cyclic references)
//! - Registry contract violations and lifecycle
//! - Assembly and translation stages

/// Reference lookup failures
///
/// Dangling or cyclic references are programmer errors in the spec graph,
/// never recoverable conditions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// No inline producer and no registered definition for the key
    #[error("no producer registered for {key}")]
    Undefined {
        /// Rendered `kind/name` key
        key: String,
    },

    /// Reference waits on a key its own resolution is still producing
    #[error("reference cycle through {key}: {}", path.join(" -> "))]
    Cycle {
        /// Rendered key that closed the cycle
        key: String,
        /// Keys in production order, ending with the repeated key
        path: Vec<String>,
    },
}

impl LookupError {
    /// Create undefined reference error
    #[inline]
    pub fn undefined(key: impl ToString) -> Self {
        Self::Undefined {
            key: key.to_string(),
        }
    }
}

/// Main engine error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// `build()` called before a required field was set
    #[error("missing required field `{field}` on {builder}")]
    MissingField {
        /// Builder type name
        builder: &'static str,
        /// Field name
        field: &'static str,
    },

    /// Reference lookup failed
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),

    /// Second insertion for a key already present in the registry
    #[error("registry already holds an entry for {key}")]
    DuplicateEntry {
        /// Rendered key
        key: String,
    },

    /// Second producer defined for the same key
    #[error("producer already defined for {key}")]
    DuplicateDefinition {
        /// Rendered key
        key: String,
    },

    /// The producer for a key failed or was cancelled before publishing
    #[error("producer for {key} was abandoned before completing")]
    Abandoned {
        /// Rendered key
        key: String,
    },

    /// Operation on a closed registry
    #[error("registry is closed")]
    RegistryClosed,

    /// Scaffold nesting exceeded the configured limit
    #[error("resolution depth exceeded limit of {limit}")]
    DepthExceeded {
        /// Configured limit
        limit: usize,
    },

    /// Reference met during local resolution, which has no registry
    #[error("reference {key} cannot be resolved without a registry")]
    UnresolvedReference {
        /// Rendered key
        key: String,
    },

    /// Assembly function rejected its children
    #[error("assembly failed: {0}")]
    Assembly(String),

    /// Translator stage failed
    #[error("translation failed: {0}")]
    Translation(String),

    /// Builder rejected a field value
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// Field name
        field: String,
        /// What was wrong
        message: String,
    },

    /// A resolution task panicked
    #[error("resolution task failed: {0}")]
    TaskFailed(String),

    /// Configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create missing field error
    #[inline]
    #[must_use]
    pub fn missing_field(builder: &'static str, field: &'static str) -> Self {
        Self::MissingField { builder, field }
    }

    /// Create assembly error
    #[inline]
    pub fn assembly(message: impl Into<String>) -> Self {
        Self::Assembly(message.into())
    }

    /// Create translation error
    #[inline]
    pub fn translation(message: impl Into<String>) -> Self {
        Self::Translation(message.into())
    }

    /// Create invalid value error
    #[inline]
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Check if error is a lookup failure
    #[inline]
    #[must_use]
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup(_))
    }

    /// Check if error is a reference cycle
    #[inline]
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Lookup(LookupError::Cycle { .. }))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;
