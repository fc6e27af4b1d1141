//! Error types for autosource-core operations.
//!
//! Recoverable conditions (missing files, unowned markers, declined prompts)
//! are ordinary return values, not errors; only unexpected OS-level failures
//! end up here and propagate to the caller.

/// All errors that can occur in the decision engine.
#[derive(Debug, thiserror::Error)]
pub enum AutosourceError {
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot determine user cache directory")]
    NoCacheDir,

    #[error("Cannot determine home directory")]
    NoHomeDir,
}

impl AutosourceError {
    /// Wraps an I/O error with a context string naming the failed operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        AutosourceError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using AutosourceError.
pub type Result<T> = std::result::Result<T, AutosourceError>;
