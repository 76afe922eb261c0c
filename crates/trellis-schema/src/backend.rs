//! Output backends
//!
//! A [`SerializationBackend`] renders a resolved [`Schema`] as text and
//! writes it to one fixed file name under an output directory. An
//! [`EmissionBackend`] turns a schema into source files; none ships here.

use crate::error::EmitError;
use crate::schema::Schema;
use std::fs;
use std::path::{Path, PathBuf};

/// Renders a schema to one text document
pub trait SerializationBackend: Send + Sync {
    /// Backend name for diagnostics
    fn name(&self) -> &'static str;

    /// File written under the output directory
    fn file_name(&self) -> &'static str;

    /// Render `schema`
    ///
    /// # Errors
    /// Serializer failures.
    fn render(&self, schema: &Schema) -> Result<String, EmitError>;

    /// Render `schema` into `out_dir`, creating it if needed
    ///
    /// # Errors
    /// Rendering or file system failures.
    fn write(&self, schema: &Schema, out_dir: &Path) -> Result<PathBuf, EmitError> {
        let rendered = self.render(schema)?;
        fs::create_dir_all(out_dir).map_err(|e| EmitError::io(out_dir, e))?;
        let path = out_dir.join(self.file_name());
        fs::write(&path, rendered).map_err(|e| EmitError::io(&path, e))?;
        tracing::debug!("{} backend wrote {}", self.name(), path.display());
        Ok(path)
    }
}

/// Pretty-printed JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBackend;

impl SerializationBackend for JsonBackend {
    fn name(&self) -> &'static str {
        "json"
    }

    fn file_name(&self) -> &'static str {
        "schema.json"
    }

    fn render(&self, schema: &Schema) -> Result<String, EmitError> {
        Ok(serde_json::to_string_pretty(schema)?)
    }
}

/// YAML document
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlBackend;

impl SerializationBackend for YamlBackend {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn file_name(&self) -> &'static str {
        "schema.yaml"
    }

    fn render(&self, schema: &Schema) -> Result<String, EmitError> {
        Ok(serde_yaml::to_string(schema)?)
    }
}

/// Generates source files from a schema
///
/// Implementations only touch the file system under `out_dir`.
pub trait EmissionBackend: Send + Sync {
    /// Backend name for diagnostics
    fn name(&self) -> &'static str;

    /// Emit files for `schema` under `out_dir`
    ///
    /// # Errors
    /// Backend-specific; file system failures as [`EmitError::Io`].
    fn emit(&self, schema: &Schema, out_dir: &Path) -> Result<(), EmitError>;
}
