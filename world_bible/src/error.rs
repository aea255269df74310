use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a single knowledge-base file.
///
/// [`crate::Loader::load_all`] never propagates these: it logs them and
/// substitutes the category's empty default.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON.
    #[error("invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON is valid but does not have an accepted shape.
    #[error("unexpected shape in '{path}': {message}")]
    Shape { path: PathBuf, message: String },
}

impl LoadError {
    /// Path of the file that failed.
    pub fn path(&self) -> &std::path::Path {
        match self {
            LoadError::Io { path, .. } | LoadError::Json { path, .. } | LoadError::Shape { path, .. } => {
                path
            }
        }
    }
}
