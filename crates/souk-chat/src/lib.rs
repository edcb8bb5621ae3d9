//! Real-time room messaging core for the Souk marketplace backend.
//!
//! Everything else in the backend is request/response CRUD and lives outside
//! this crate, reached only through the [`Gateway`] trait. This crate is the
//! one component with genuine concurrency requirements: shared mutable
//! registries accessed from many tasks, a backpressure policy for slow
//! consumers, and lifecycle coordination between network I/O and state
//! mutation.
//!
//! # Architecture
//!
//! - [`RoomRegistry`]: process-wide map from room identifier to live
//!   [`Room`], lazily materialized from persisted state.
//! - [`Room`]: membership map for one conversation; register, unregister,
//!   and non-blocking broadcast with slow-consumer eviction.
//! - [`attach`]: the session entry point; one inbound and one outbound loop
//!   per connection, joined by a bounded [`Mailbox`].
//! - [`Gateway`]: the persistence interface the core consumes but does not
//!   implement. Every accepted frame is durably appended before it is
//!   broadcast (durable-before-visible).
//! - [`Transport`]: one bidirectional socket per client; websocket in
//!   production, channel-backed in tests.
//!
//! # Delivery semantics
//!
//! Broadcasts are totally ordered per room. Delivery is best-effort: a full
//! mailbox evicts the recipient instead of blocking the sender, and a
//! persistence failure drops the affected frame. A sender's own session
//! never receives its own message back.

mod config;
mod error;
pub mod gateway;
mod mailbox;
mod registry;
mod room;
mod session;
pub mod transport;

pub use config::{ChatConfig, DEFAULT_MAILBOX_CAPACITY, DEFAULT_MAX_CONNECTIONS};
pub use error::ChatError;
pub use gateway::{FlakyGateway, Gateway, GatewayError, MemoryGateway, Message, RoomMetadata, history};
pub use mailbox::{Mailbox, MailboxReceiver, PushError};
pub use registry::RoomRegistry;
pub use room::Room;
pub use session::attach;
pub use transport::{
    ChannelTransport, Transport, TransportError, TransportPeer, TransportReader, TransportWriter,
    WsTransport, channel_pair,
};

/// Identifier of a conversation room.
///
/// Opaque and stable for the conversation's lifetime; sourced from persisted
/// storage, never generated by the core.
pub type RoomId = u64;

/// Identifier of a participant, supplied pre-validated by the caller.
pub type ParticipantId = String;

/// Process-unique identifier of one live session.
///
/// Distinguishes two successive connections of the same participant so a
/// replaced session's late teardown cannot evict its replacement.
pub type SessionId = u64;
