//! Room membership and broadcast fan-out.
//!
//! A room owns the set of sessions currently present for one conversation,
//! keyed by participant identifier. The membership map is partitioned per
//! room (never one global scan), so broadcast cost scales with room
//! occupancy, not total connected clients.
//!
//! All three operations mutate membership under the room's single mutex and
//! never await while holding it, which totally orders broadcasts per room:
//! every recipient sees payloads in the order the `broadcast` calls were
//! made, regardless of sender.

use std::{collections::HashMap, sync::Mutex};

use bytes::Bytes;

use crate::{
    ParticipantId, RoomId, SessionId,
    mailbox::{Mailbox, PushError},
};

/// One registered session's entry in the membership map.
#[derive(Debug)]
struct Member {
    /// Distinguishes this connection from an earlier or later connection of
    /// the same participant.
    session_id: SessionId,
    /// Sender half of the session's outbound queue. Dropping the entry
    /// closes the mailbox.
    mailbox: Mailbox,
}

/// A named conversation scope containing zero or more connected participants.
///
/// Long-lived relative to any single connection; materialized on demand by
/// [`crate::RoomRegistry`] and never evicted in the base design. The room
/// exclusively owns the registry entries of its sessions; a session holds
/// only a shared handle back to its room.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    members: Mutex<HashMap<ParticipantId, Member>>,
}

impl Room {
    /// Create an empty room. Only the registry materializes rooms.
    pub(crate) fn new(id: RoomId) -> Self {
        Self { id, members: Mutex::new(HashMap::new()) }
    }

    /// Room identifier.
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Insert a session into the membership map.
    ///
    /// Last connection wins per participant: if an entry already exists
    /// under the same identifier, it is replaced and the prior session's
    /// mailbox closes, which shuts that session's transport down. The swap
    /// is atomic under the membership mutex - no observer ever sees two
    /// sessions for one participant.
    ///
    /// # Panics
    ///
    /// Panics if the membership mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn register(&self, participant: ParticipantId, session_id: SessionId, mailbox: Mailbox) {
        let mut members = self.members.lock().expect("Mutex poisoned");

        let entry = Member { session_id, mailbox };
        if let Some(prior) = members.insert(participant.clone(), entry) {
            tracing::debug!(
                room_id = self.id,
                participant = %participant,
                prior_session = prior.session_id,
                session = session_id,
                "replacing existing session for participant"
            );
        } else {
            tracing::debug!(
                room_id = self.id,
                participant = %participant,
                session = session_id,
                "session registered"
            );
        }
    }

    /// Remove a session from the membership map.
    ///
    /// Removes the entry only if it still belongs to `session_id`, so a
    /// replaced session's late unregister cannot evict its replacement.
    /// Idempotent: the mailbox closes at most once (when the entry is
    /// dropped) and a second call is a no-op. Returns whether an entry was
    /// removed.
    ///
    /// # Panics
    ///
    /// Panics if the membership mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn unregister(&self, participant: &str, session_id: SessionId) -> bool {
        let mut members = self.members.lock().expect("Mutex poisoned");

        if members.get(participant).is_some_and(|member| member.session_id == session_id) {
            members.remove(participant);
            tracing::debug!(
                room_id = self.id,
                participant,
                session = session_id,
                "session unregistered"
            );
            true
        } else {
            false
        }
    }

    /// Deliver `payload` to every registered session except the sender's
    /// own entry (no self-echo).
    ///
    /// Delivery is non-blocking per recipient. A recipient whose mailbox is
    /// full is treated as unresponsive: its entry is removed (closing the
    /// mailbox, which shuts its transport down) while delivery to all other
    /// members proceeds. A closed mailbox (outbound loop already gone) is
    /// evicted the same way. The sender is never blocked and never sees an
    /// error. Returns the number of mailboxes the payload was inserted into.
    ///
    /// # Panics
    ///
    /// Panics if the membership mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn broadcast(&self, payload: &Bytes, sender: SessionId) -> usize {
        let mut members = self.members.lock().expect("Mutex poisoned");
        let mut delivered = 0;

        members.retain(|participant, member| {
            if member.session_id == sender {
                return true;
            }
            match member.mailbox.push(payload.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                },
                Err(PushError::Full) => {
                    tracing::warn!(
                        room_id = self.id,
                        participant = %participant,
                        session = member.session_id,
                        "mailbox full, evicting slow consumer"
                    );
                    false
                },
                Err(PushError::Closed) => {
                    tracing::debug!(
                        room_id = self.id,
                        participant = %participant,
                        session = member.session_id,
                        "mailbox closed, dropping stale member"
                    );
                    false
                },
            }
        });

        delivered
    }

    /// Number of currently registered sessions.
    ///
    /// # Panics
    ///
    /// Panics if the membership mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn member_count(&self) -> usize {
        self.members.lock().expect("Mutex poisoned").len()
    }

    /// Whether a participant currently has a session in this room.
    ///
    /// # Panics
    ///
    /// Panics if the membership mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn is_member(&self, participant: &str) -> bool {
        self.members.lock().expect("Mutex poisoned").contains_key(participant)
    }

    /// Session id registered for a participant, if any.
    ///
    /// # Panics
    ///
    /// Panics if the membership mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn session_of(&self, participant: &str) -> Option<SessionId> {
        self.members
            .lock()
            .expect("Mutex poisoned")
            .get(participant)
            .map(|member| member.session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::Mailbox;

    // A session id no test registers; broadcasts from it reach everyone.
    const OUTSIDER: SessionId = 0;

    #[test]
    fn broadcast_reaches_all_members_in_order() {
        let room = Room::new(42);

        let (box_a, mut rx_a) = Mailbox::new(8);
        let (box_b, mut rx_b) = Mailbox::new(8);
        room.register("a".to_string(), 1, box_a);
        room.register("b".to_string(), 2, box_b);

        assert_eq!(room.broadcast(&Bytes::from_static(b"one"), OUTSIDER), 2);
        assert_eq!(room.broadcast(&Bytes::from_static(b"two"), OUTSIDER), 2);

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"one"));
            assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"two"));
        }
    }

    #[test]
    fn broadcast_skips_the_sender() {
        let room = Room::new(42);

        let (box_a, mut rx_a) = Mailbox::new(8);
        let (box_b, mut rx_b) = Mailbox::new(8);
        room.register("a".to_string(), 1, box_a);
        room.register("b".to_string(), 2, box_b);

        assert_eq!(room.broadcast(&Bytes::from_static(b"hello"), 1), 1);

        assert!(rx_a.try_recv().is_none());
        assert_eq!(rx_b.try_recv().unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn full_mailbox_evicts_only_the_slow_member() {
        let room = Room::new(42);

        let (box_slow, _rx_slow) = Mailbox::new(1);
        let (box_ok, mut rx_ok) = Mailbox::new(8);
        room.register("slow".to_string(), 1, box_slow);
        room.register("ok".to_string(), 2, box_ok);

        // First broadcast fills the slow member's mailbox.
        assert_eq!(room.broadcast(&Bytes::from_static(b"one"), OUTSIDER), 2);
        // Second broadcast finds it full: evicted, the other still delivered.
        assert_eq!(room.broadcast(&Bytes::from_static(b"two"), OUTSIDER), 1);

        assert!(!room.is_member("slow"));
        assert!(room.is_member("ok"));
        assert_eq!(rx_ok.try_recv().unwrap(), Bytes::from_static(b"one"));
        assert_eq!(rx_ok.try_recv().unwrap(), Bytes::from_static(b"two"));
    }

    #[test]
    fn closed_mailbox_is_dropped_on_broadcast() {
        let room = Room::new(42);

        let (box_gone, rx_gone) = Mailbox::new(8);
        room.register("gone".to_string(), 1, box_gone);
        drop(rx_gone);

        assert_eq!(room.broadcast(&Bytes::from_static(b"hi"), OUTSIDER), 0);
        assert!(!room.is_member("gone"));
    }

    #[test]
    fn register_replaces_prior_session_for_participant() {
        let room = Room::new(42);

        let (box_old, mut rx_old) = Mailbox::new(8);
        let (box_new, mut rx_new) = Mailbox::new(8);
        room.register("a".to_string(), 1, box_old);
        room.register("a".to_string(), 2, box_new);

        assert_eq!(room.member_count(), 1);
        assert_eq!(room.session_of("a"), Some(2));

        // Old mailbox closed by the replacement; new one receives.
        room.broadcast(&Bytes::from_static(b"hi"), OUTSIDER);
        assert!(rx_old.try_recv().is_none());
        assert_eq!(rx_new.try_recv().unwrap(), Bytes::from_static(b"hi"));
    }

    #[test]
    fn unregister_is_idempotent() {
        let room = Room::new(42);

        let (mailbox, _rx) = Mailbox::new(8);
        room.register("a".to_string(), 1, mailbox);

        assert!(room.unregister("a", 1));
        assert!(!room.unregister("a", 1));
        assert_eq!(room.member_count(), 0);
    }

    #[test]
    fn stale_unregister_does_not_evict_replacement() {
        let room = Room::new(42);

        let (box_old, _rx_old) = Mailbox::new(8);
        let (box_new, _rx_new) = Mailbox::new(8);
        room.register("a".to_string(), 1, box_old);
        room.register("a".to_string(), 2, box_new);

        // Session 1's late teardown must not remove session 2's entry.
        assert!(!room.unregister("a", 1));
        assert_eq!(room.session_of("a"), Some(2));
    }

    #[test]
    fn broadcast_to_empty_room_is_a_no_op() {
        let room = Room::new(42);
        assert_eq!(room.broadcast(&Bytes::from_static(b"hi"), OUTSIDER), 0);
    }
}
