//! Runtime configuration for the messaging core.

/// Default capacity of a session's outbound mailbox.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Default cap on concurrently attached sessions.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10_000;

/// Configuration shared by all sessions.
///
/// `mailbox_capacity` bounds how far a recipient may fall behind before it is
/// evicted (see [`crate::Room::broadcast`]). `max_connections` is enforced by
/// the accept glue, not by the core itself.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Capacity of each session's outbound mailbox. Must be non-zero.
    pub mailbox_capacity: usize,
    /// Maximum concurrently attached sessions.
    pub max_connections: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::default();
        assert_eq!(config.mailbox_capacity, 256);
        assert_eq!(config.max_connections, 10_000);
    }
}
