use std::path::PathBuf;
use thiserror::Error;

/// Structured detail about a rendered document that failed markup
/// validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupDiagnostic {
    /// 1-based line of the offending position.
    pub line: usize,
    /// 1-based column (in characters) of the offending position.
    pub column: usize,
    /// What went wrong.
    pub message: String,
    /// Source text around the offending position.
    pub excerpt: String,
    /// The full raw document.
    pub document: String,
}

impl std::fmt::Display for MarkupDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at line {}, column {} near '{}'",
            self.message, self.line, self.column, self.excerpt
        )
    }
}

/// Errors raised by context construction.
///
/// Per-item problems (missing entity, bad field path, unreadable file) are
/// logged and skipped; only pipeline preconditions and final-document
/// validation surface here.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A pipeline component was used before it was set up.
    #[error("Not initialized: {0}")]
    NotInitialized(&'static str),

    /// The rendered document is not well-formed markup.
    #[error("Document validation failed: {0}")]
    DocumentValidation(Box<MarkupDiagnostic>),

    /// A configuration file explicitly requested by the caller could not
    /// be read or decoded.
    #[error("Configuration error in '{path}': {message}")]
    Config { path: PathBuf, message: String },

    /// Engine settings are not valid TOML.
    #[error("Settings error: {0}")]
    Settings(#[from] toml::de::Error),
}

impl ContextError {
    /// Diagnostic detail of a validation failure.
    pub fn diagnostic(&self) -> Option<&MarkupDiagnostic> {
        match self {
            ContextError::DocumentValidation(diag) => Some(diag),
            _ => None,
        }
    }
}

impl From<MarkupDiagnostic> for ContextError {
    fn from(diag: MarkupDiagnostic) -> Self {
        ContextError::DocumentValidation(Box::new(diag))
    }
}
