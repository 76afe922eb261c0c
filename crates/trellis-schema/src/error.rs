//! Backend error types

use std::path::PathBuf;

/// Failure while rendering or writing a schema
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// Serializing to JSON failed
    #[error("json rendering failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Serializing to YAML failed
    #[error("yaml rendering failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Output could not be written
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backend-specific failure
    #[error("{backend} backend failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },
}

impl EmitError {
    /// Create io error for `path`
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
