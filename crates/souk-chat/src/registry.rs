//! Process-wide room registry.
//!
//! One mapping from room identifier to live [`Room`], lazily materialized
//! from persisted state on first access. Lookups take a shared read lock and
//! never block each other; only the insertion of a newly materialized room
//! takes the exclusive write lock. The check-then-insert under that write
//! lock is a single critical section, so concurrent resolvers of the same
//! unknown identifier always converge on one `Room` object.
//!
//! Rooms are never evicted; they are reclaimed only by process exit.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{RoomId, error::ChatError, gateway::Gateway, room::Room};

/// Registry mapping room identifiers to live rooms.
///
/// Created once at process start and shared by every session. The registry
/// never creates room identifiers; it only materializes rooms the gateway
/// confirms exist.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, Arc<Room>>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the live room for `room_id`, materializing it on first access.
    ///
    /// Fast path: a shared read-lock lookup. On a miss the gateway is asked
    /// to confirm the room exists; [`ChatError::RoomNotFound`] is returned -
    /// and nothing inserted - if it does not. On confirmation the room is
    /// inserted under the write lock with a re-check, so two racing callers
    /// both receive the same `Arc<Room>` and at most one live room exists
    /// per identifier.
    pub async fn resolve<G: Gateway + ?Sized>(
        &self,
        room_id: RoomId,
        gateway: &G,
    ) -> Result<Arc<Room>, ChatError> {
        if let Some(room) = self.rooms.read().await.get(&room_id) {
            return Ok(Arc::clone(room));
        }

        let Some(metadata) = gateway.resolve_room(room_id).await? else {
            return Err(ChatError::RoomNotFound(room_id));
        };

        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id).or_insert_with(|| {
            tracing::debug!(room_id, title = %metadata.title, "room materialized");
            Arc::new(Room::new(room_id))
        });
        Ok(Arc::clone(room))
    }

    /// Look up an already materialized room without touching the gateway.
    pub async fn get(&self, room_id: RoomId) -> Option<Arc<Room>> {
        self.rooms.read().await.get(&room_id).map(Arc::clone)
    }

    /// Number of materialized rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;

    #[tokio::test]
    async fn resolve_materializes_once() {
        let registry = RoomRegistry::new();
        let gateway = MemoryGateway::new();
        gateway.add_room(42, "garden chairs");

        let first = registry.resolve(42, &gateway).await.unwrap();
        let second = registry.resolve(42, &gateway).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.room_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_room_is_refused_without_insertion() {
        let registry = RoomRegistry::new();
        let gateway = MemoryGateway::new();

        let err = registry.resolve(99, &gateway).await.unwrap_err();
        assert!(matches!(err, ChatError::RoomNotFound(99)));
        assert_eq!(registry.room_count().await, 0);
        assert!(registry.get(99).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_resolution_converges_on_one_room() {
        let registry = Arc::new(RoomRegistry::new());
        let gateway = Arc::new(MemoryGateway::new());
        gateway.add_room(42, "garden chairs");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let gateway = Arc::clone(&gateway);
            handles.push(tokio::spawn(
                async move { registry.resolve(42, gateway.as_ref()).await },
            ));
        }

        let mut rooms = Vec::new();
        for handle in handles {
            rooms.push(handle.await.unwrap().unwrap());
        }
        for room in &rooms {
            assert!(Arc::ptr_eq(room, &rooms[0]));
        }
        assert_eq!(registry.room_count().await, 1);
    }

    #[tokio::test]
    async fn gateway_failure_surfaces_without_insertion() {
        use crate::gateway::FlakyGateway;

        let registry = RoomRegistry::new();
        let gateway = FlakyGateway::new(MemoryGateway::new());
        gateway.inner().add_room(42, "garden chairs");
        gateway.fail_resolves(true);

        let err = registry.resolve(42, &gateway).await.unwrap_err();
        assert!(matches!(err, ChatError::Gateway(_)));
        assert_eq!(registry.room_count().await, 0);
    }
}
