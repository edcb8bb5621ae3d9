//! Core error taxonomy.
//!
//! Failures are contained at the session boundary: a transport error ends
//! exactly one session, a persistence failure drops exactly one frame, and a
//! full mailbox evicts exactly one recipient. The only errors that surface
//! to the caller attaching a session are the ones below.

use crate::{RoomId, gateway::GatewayError};

/// Errors surfaced by the messaging core.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The requested room does not exist in persisted storage.
    ///
    /// Surfaced at attach time; the caller must refuse the connection. The
    /// core closes the transport and registers nothing.
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    /// The persistence gateway failed during room resolution.
    ///
    /// Only fatal at attach time. Inside a session's inbound loop a gateway
    /// failure is logged, the affected frame dropped, and the loop
    /// continues.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        assert_eq!(ChatError::RoomNotFound(42).to_string(), "room not found: 42");

        let err = ChatError::Gateway(GatewayError::Unavailable("db down".to_string()));
        assert_eq!(err.to_string(), "gateway error: persistence unavailable: db down");
    }
}
