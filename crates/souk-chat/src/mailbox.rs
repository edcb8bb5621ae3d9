//! Bounded outbound mailbox.
//!
//! The mailbox decouples message production (broadcast, which must never
//! block) from message transmission (the socket write, which may). Insertion
//! is non-blocking: a full mailbox is reported to the caller, never waited
//! on. The room reacts by evicting the slow recipient.
//!
//! The sender half lives in the room's membership map; the receiver half is
//! drained by the session's outbound loop. Dropping the sender half closes
//! the mailbox, which is how unregister and backpressure eviction signal the
//! outbound loop to stop.

use bytes::Bytes;
use tokio::sync::mpsc;

/// Why a payload could not be inserted into a mailbox.
///
/// Internal signal consumed by [`crate::Room::broadcast`]; never surfaced to
/// the sender of a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    /// The mailbox is at capacity. The recipient is falling behind.
    Full,
    /// The receiver half is gone (the outbound loop already exited).
    Closed,
}

/// Sender half of a session's bounded outbound queue.
///
/// Owned by the room's membership entry. Dropping it closes the mailbox.
#[derive(Debug)]
pub struct Mailbox {
    tx: mpsc::Sender<Bytes>,
}

impl Mailbox {
    /// Create a mailbox pair with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> (Self, MailboxReceiver) {
        assert!(capacity > 0, "mailbox capacity must be non-zero, got {capacity}");
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, MailboxReceiver { rx })
    }

    /// Insert a payload without blocking.
    ///
    /// Returns [`PushError::Full`] when the mailbox is at capacity and
    /// [`PushError::Closed`] when the receiver half has been dropped.
    pub fn push(&self, payload: Bytes) -> Result<(), PushError> {
        self.tx.try_send(payload).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => PushError::Full,
            mpsc::error::TrySendError::Closed(_) => PushError::Closed,
        })
    }
}

/// Receiver half of a session's outbound queue.
///
/// Drained by the session's outbound loop until the mailbox is closed.
#[derive(Debug)]
pub struct MailboxReceiver {
    rx: mpsc::Receiver<Bytes>,
}

impl MailboxReceiver {
    /// Take the next payload, waiting if the mailbox is empty.
    ///
    /// Returns `None` once the mailbox is closed and fully drained.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Take the next payload without waiting.
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }
}
