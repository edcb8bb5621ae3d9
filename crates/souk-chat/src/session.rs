//! Client session lifecycle.
//!
//! [`attach`] is the single entry point the surrounding HTTP layer calls
//! with an already-upgraded transport and a pre-validated participant
//! identity. It resolves the room, registers the session, and runs the two
//! per-session loops:
//!
//! - the inbound loop (this task) reads frames, persists them through the
//!   gateway, and asks the room to broadcast; it is the sole teardown
//!   trigger,
//! - the outbound loop (a spawned task) drains the mailbox to the transport
//!   and closes the write side once the mailbox closes.
//!
//! Teardown is cooperative: transport closure or a read error ends the
//! inbound loop, which unregisters the session; unregistering closes the
//! mailbox, which lets the outbound loop finish on its own. No forced
//! cancellation anywhere.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    ParticipantId, RoomId, SessionId,
    config::ChatConfig,
    error::ChatError,
    gateway::Gateway,
    mailbox::Mailbox,
    registry::RoomRegistry,
    transport::{Transport, TransportReader, TransportWriter},
};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Attach a new real-time session and run it to completion.
///
/// Resolves the room (failing with [`ChatError::RoomNotFound`] and closing
/// the transport if it does not exist - nothing is registered in that case),
/// registers the session under `participant`, spawns the outbound loop, and
/// then drives the inbound loop on the calling task until the transport
/// closes or errors. Returns once the session is fully torn down, which
/// makes connection accounting in the accept glue a matter of awaiting this
/// call.
///
/// A persistence failure inside the loop drops that single frame and
/// continues; message loss on persistence failure is accepted, not retried.
/// On success the frame is durably appended before it is broadcast.
pub async fn attach<T, G>(
    registry: &RoomRegistry,
    gateway: &G,
    transport: T,
    participant: ParticipantId,
    room_id: RoomId,
    config: &ChatConfig,
) -> Result<(), ChatError>
where
    T: Transport,
    G: Gateway + ?Sized,
{
    let (mut writer, mut reader) = transport.split();

    let room = match registry.resolve(room_id, gateway).await {
        Ok(room) => room,
        Err(err) => {
            tracing::debug!(room_id, participant = %participant, %err, "attach refused");
            writer.close().await;
            return Err(err);
        },
    };

    let session_id = next_session_id();
    let (mailbox, mut inbox) = Mailbox::new(config.mailbox_capacity);
    room.register(participant.clone(), session_id, mailbox);

    tracing::info!(room_id, participant = %participant, session = session_id, "session attached");

    // Outbound loop: mailbox -> transport. Exits when the mailbox closes
    // (unregister or backpressure eviction) or a write fails, then closes
    // the transport's write side.
    let outbound = tokio::spawn(async move {
        while let Some(payload) = inbox.recv().await {
            if let Err(err) = writer.send(payload).await {
                tracing::debug!(session = session_id, %err, "outbound write failed");
                break;
            }
        }
        writer.close().await;
    });

    // Inbound loop: transport -> gateway -> room. Sole teardown trigger.
    loop {
        match reader.receive().await {
            Ok(Some(frame)) => {
                match gateway.append_message(room_id, &participant, &frame).await {
                    Ok(message_id) => {
                        tracing::trace!(room_id, message_id, "message persisted");
                        room.broadcast(&frame, session_id);
                    },
                    Err(err) => {
                        tracing::warn!(
                            room_id,
                            participant = %participant,
                            %err,
                            "persistence failed, dropping frame"
                        );
                    },
                }
            },
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(session = session_id, %err, "transport read failed");
                break;
            },
        }
    }

    room.unregister(&participant, session_id);
    tracing::info!(room_id, participant = %participant, session = session_id, "session detached");

    // Closing the mailbox above lets the outbound loop drain and finish.
    let _ = outbound.await;
    Ok(())
}
