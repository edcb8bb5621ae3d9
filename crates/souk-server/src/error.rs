//! Server error types.

use souk_chat::ChatError;

/// Errors that can occur in the server glue.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error (invalid bind address, etc.).
    ///
    /// Fatal; fix configuration and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport/network error (bind failure, failed upgrade handshake,
    /// broken socket).
    ///
    /// Fatal only for the affected connection unless it happens at bind
    /// time.
    #[error("transport error: {0}")]
    Transport(String),

    /// Error surfaced by the messaging core while attaching a session.
    #[error("chat error: {0}")]
    Chat(#[from] ChatError),
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
