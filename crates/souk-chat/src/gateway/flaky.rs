//! Fault-injecting gateway wrapper for testing.
//!
//! Wraps another gateway and fails selected operations on demand. Used to
//! verify that a persistence failure drops exactly the affected frame and
//! never tears down the session, and that resolution failures refuse the
//! attach without materializing a room.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use super::{Gateway, GatewayError, Message, RoomMetadata};
use crate::RoomId;

/// Gateway wrapper that injects failures into selected operations.
///
/// Delegates to an inner gateway unless the corresponding switch is set.
/// Clones share the same switches, so a test can flip them while sessions
/// are live.
#[derive(Clone)]
pub struct FlakyGateway<G> {
    inner: G,
    fail_appends: Arc<AtomicBool>,
    fail_resolves: Arc<AtomicBool>,
}

impl<G: Gateway> FlakyGateway<G> {
    /// Wrap `inner` with all switches off.
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            fail_appends: Arc::new(AtomicBool::new(false)),
            fail_resolves: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every `append_message` fail until switched back off.
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Make every `resolve_room` fail until switched back off.
    pub fn fail_resolves(&self, fail: bool) {
        self.fail_resolves.store(fail, Ordering::SeqCst);
    }

    /// The wrapped gateway.
    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<G: Gateway> Gateway for FlakyGateway<G> {
    async fn resolve_room(&self, room_id: RoomId) -> Result<Option<RoomMetadata>, GatewayError> {
        if self.fail_resolves.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("injected resolve failure".to_string()));
        }
        self.inner.resolve_room(room_id).await
    }

    async fn append_message(
        &self,
        room_id: RoomId,
        sender: &str,
        content: &[u8],
    ) -> Result<u64, GatewayError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("injected append failure".to_string()));
        }
        self.inner.append_message(room_id, sender, content).await
    }

    async fn list_messages(&self, room_id: RoomId) -> Result<Vec<Message>, GatewayError> {
        self.inner.list_messages(room_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;

    #[tokio::test]
    async fn append_switch_injects_failures() {
        let gateway = FlakyGateway::new(MemoryGateway::new());
        gateway.inner().add_room(1, "listing");

        gateway.fail_appends(true);
        assert!(gateway.append_message(1, "u1", b"lost").await.is_err());
        assert_eq!(gateway.inner().message_count(1), 0);

        gateway.fail_appends(false);
        gateway.append_message(1, "u1", b"kept").await.unwrap();
        assert_eq!(gateway.inner().message_count(1), 1);
    }

    #[tokio::test]
    async fn resolve_switch_injects_failures() {
        let gateway = FlakyGateway::new(MemoryGateway::new());
        gateway.inner().add_room(1, "listing");

        gateway.fail_resolves(true);
        assert!(gateway.resolve_room(1).await.is_err());

        gateway.fail_resolves(false);
        assert!(gateway.resolve_room(1).await.unwrap().is_some());
    }
}
