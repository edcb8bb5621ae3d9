//! Persistence gateway abstraction.
//!
//! The messaging core durably records every accepted frame and resolves room
//! metadata through this trait. The real implementation lives in the CRUD
//! layer of the marketplace backend; this crate consumes it and ships an
//! in-memory implementation for tests, simulation, and local development,
//! plus a fault-injecting wrapper for exercising the persistence-failure
//! path.
//!
//! The gateway owns its internal synchronization and is safe for concurrent
//! use by many sessions.

mod flaky;
mod memory;

pub use flaky::FlakyGateway;
pub use memory::MemoryGateway;
use serde::{Deserialize, Serialize};

use crate::{ParticipantId, RoomId};

/// A durably stored chat message.
///
/// Created by the gateway at the moment a frame is accepted from a session.
/// The core holds only the transient in-flight payload; this record is what
/// history hydration returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Storage-assigned message identifier.
    pub id: u64,
    /// Room the message belongs to.
    pub room_id: RoomId,
    /// Participant that sent the message.
    pub sender: ParticipantId,
    /// Message content. Invalid UTF-8 in the wire payload is replaced.
    pub content: String,
    /// Unix timestamp (seconds) when the message was accepted.
    pub created_at_secs: u64,
    /// Whether the recipient has read the message. Set by the CRUD layer,
    /// never by the core.
    pub read: bool,
}

/// Metadata about a room, resolved from persisted storage.
///
/// The core treats this as opaque confirmation that the room exists; the
/// title is carried for logging only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMetadata {
    /// Room identifier, stable for the conversation's lifetime.
    pub room_id: RoomId,
    /// Display title of the conversation (e.g. the listing it concerns).
    pub title: String,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// The backing store could not serve the request.
    ///
    /// Local to one operation. During message append the affected frame is
    /// dropped and the session continues; during room resolution the attach
    /// is refused.
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage interface consumed by the messaging core.
///
/// Implementations must be safe for concurrent use; the core calls them from
/// many session tasks simultaneously.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync + 'static {
    /// Resolve metadata for a room.
    ///
    /// Returns `Ok(None)` if no such room exists. The core never creates
    /// rooms; identifiers are sourced from persisted storage.
    async fn resolve_room(&self, room_id: RoomId) -> Result<Option<RoomMetadata>, GatewayError>;

    /// Durably append a message, returning its storage-assigned id.
    ///
    /// Called before the payload is broadcast, giving the durable-before-
    /// visible guarantee.
    async fn append_message(
        &self,
        room_id: RoomId,
        sender: &str,
        content: &[u8],
    ) -> Result<u64, GatewayError>;

    /// All messages of a room, oldest first.
    ///
    /// History hydration for the surrounding HTTP layer; not part of the
    /// live broadcast path.
    async fn list_messages(&self, room_id: RoomId) -> Result<Vec<Message>, GatewayError>;
}

/// Hydrate the chat history of a room, oldest first.
///
/// Thin named entry point over [`Gateway::list_messages`] so the excluded
/// HTTP layer does not reach into the trait directly.
pub async fn history<G: Gateway + ?Sized>(
    gateway: &G,
    room_id: RoomId,
) -> Result<Vec<Message>, GatewayError> {
    gateway.list_messages(room_id).await
}
