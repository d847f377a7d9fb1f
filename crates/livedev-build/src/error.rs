//! Build error types.

use std::path::PathBuf;

/// Error returned by a build step.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being operated on.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Bundler executable could not be started.
    #[error("Failed to start bundler `{program}`: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Bundler ran but reported an error.
    #[error("Compile failed: {0}")]
    Compile(String),

    /// Bundler metafile could not be parsed.
    #[error("Invalid bundler metafile {}: {source}", path.display())]
    Metafile {
        /// Metafile location.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl BuildError {
    /// Attach a path to an I/O error.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
