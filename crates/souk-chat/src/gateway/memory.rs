use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};

use super::{Gateway, GatewayError, Message, RoomMetadata};
use crate::RoomId;

/// In-memory gateway implementation for testing and local development.
///
/// Rooms are seeded explicitly with [`MemoryGateway::add_room`]; messages
/// accumulate per room in append order. All state is behind Arc<Mutex<>> so
/// clones share the same store. Uses `lock().expect()`, which panics if the
/// mutex is poisoned - acceptable for test/dev code.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    inner: Arc<Mutex<MemoryGatewayInner>>,
}

#[derive(Default)]
struct MemoryGatewayInner {
    /// Seeded room metadata
    rooms: HashMap<RoomId, RoomMetadata>,
    /// Messages per room, in append order
    messages: HashMap<RoomId, Vec<Message>>,
    /// Next message id
    next_id: u64,
}

impl MemoryGateway {
    /// Create an empty gateway with no rooms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a room so the core can resolve it.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn add_room(&self, room_id: RoomId, title: &str) {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        inner.rooms.insert(room_id, RoomMetadata { room_id, title: title.to_string() });
    }

    /// Number of messages stored for a room.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn message_count(&self, room_id: RoomId) -> usize {
        let inner = self.inner.lock().expect("Mutex poisoned");
        inner.messages.get(&room_id).map_or(0, Vec::len)
    }
}

#[allow(clippy::expect_used)]
fn wall_clock_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("invariant: system clock is after Unix epoch (1970-01-01)")
        .as_secs()
}

#[async_trait::async_trait]
impl Gateway for MemoryGateway {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn resolve_room(&self, room_id: RoomId) -> Result<Option<RoomMetadata>, GatewayError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.rooms.get(&room_id).cloned())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn append_message(
        &self,
        room_id: RoomId,
        sender: &str,
        content: &[u8],
    ) -> Result<u64, GatewayError> {
        let created_at_secs = wall_clock_secs();
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        inner.next_id += 1;
        let id = inner.next_id;
        let message = Message {
            id,
            room_id,
            sender: sender.to_string(),
            content: String::from_utf8_lossy(content).into_owned(),
            created_at_secs,
            read: false,
        };
        inner.messages.entry(room_id).or_default().push(message);

        Ok(id)
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    async fn list_messages(&self, room_id: RoomId) -> Result<Vec<Message>, GatewayError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.messages.get(&room_id).cloned().unwrap_or_default())
    }
}
