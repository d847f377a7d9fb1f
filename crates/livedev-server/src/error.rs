//! Server error types.

/// Errors that stop the server from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Socket bind or accept failure.
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Server loop failure after binding.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File watcher could not be started.
    #[error("Failed to watch for changes: {0}")]
    Watch(#[from] notify::Error),

    /// Redirect status outside the 3xx range.
    #[error("Invalid redirect status: {0}")]
    RedirectStatus(u16),
}
