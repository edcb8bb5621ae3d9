//! Souk real-time chat server.
//!
//! Production glue around the [`souk_chat`] core: a TCP accept loop, the
//! websocket upgrade handshake, and connection accounting. The upgrade
//! request's path carries the room and the pre-validated participant
//! identity (`/ws/{room_id}/{participant}`) - authentication itself lives in
//! the surrounding HTTP layer, which hands this server an identity it does
//! not re-verify.
//!
//! Everything after the upgrade is [`souk_chat::attach`]: room resolution,
//! registration, and the per-session loops.

mod error;

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

pub use error::ServerError;
use souk_chat::{ChatConfig, Gateway, ParticipantId, RoomId, RoomRegistry, WsTransport, attach};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{
    handshake::server::{ErrorResponse, Request, Response},
    http::StatusCode,
};

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g. "0.0.0.0:8090").
    pub bind_address: String,
    /// Core configuration (mailbox capacity, connection cap).
    pub chat: ChatConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:8090".to_string(), chat: ChatConfig::default() }
    }
}

/// Production chat server.
///
/// Owns the listener, the process-wide [`RoomRegistry`], and the gateway
/// handle every session shares.
pub struct Server {
    listener: TcpListener,
    registry: Arc<RoomRegistry>,
    gateway: Arc<dyn Gateway>,
    config: ChatConfig,
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Create and bind a new server.
    pub async fn bind(
        config: ServerRuntimeConfig,
        gateway: Arc<dyn Gateway>,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_address).await.map_err(|err| {
            ServerError::Config(format!("cannot bind '{}': {err}", config.bind_address))
        })?;

        Ok(Self {
            listener,
            registry: Arc::new(RoomRegistry::new()),
            gateway,
            config: config.chat,
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server, accepting connections and attaching sessions.
    ///
    /// Runs until the listener fails. Each accepted connection gets its own
    /// task; a connection past the `max_connections` cap is dropped before
    /// the upgrade.
    pub async fn run(self) -> Result<(), ServerError> {
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::error!(%err, "accept error");
                    continue;
                },
            };

            if self.active.load(Ordering::SeqCst) >= self.config.max_connections {
                tracing::warn!(%addr, "connection refused: max connections reached");
                drop(stream);
                continue;
            }
            self.active.fetch_add(1, Ordering::SeqCst);

            let registry = Arc::clone(&self.registry);
            let gateway = Arc::clone(&self.gateway);
            let config = self.config.clone();
            let active = Arc::clone(&self.active);

            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, registry, gateway, config).await {
                    tracing::debug!(%addr, %err, "connection ended with error");
                }
                active.fetch_sub(1, Ordering::SeqCst);
            });
        }
    }
}

/// Upgrade one TCP connection to a websocket and run its session.
async fn handle_connection(
    stream: TcpStream,
    registry: Arc<RoomRegistry>,
    gateway: Arc<dyn Gateway>,
    config: ChatConfig,
) -> Result<(), ServerError> {
    let mut route: Option<(RoomId, ParticipantId)> = None;

    let ws = tokio_tungstenite::accept_hdr_async(stream, |request: &Request, response: Response| {
        match parse_path(request.uri().path()) {
            Some(parsed) => {
                route = Some(parsed);
                Ok(response)
            },
            None => Err(bad_request(format!("unrecognized path: {}", request.uri().path()))),
        }
    })
    .await
    .map_err(|err| ServerError::Transport(format!("upgrade failed: {err}")))?;

    let Some((room_id, participant)) = route else {
        return Err(ServerError::Transport("handshake completed without a route".to_string()));
    };

    tracing::debug!(room_id, participant = %participant, "websocket upgraded");

    attach(&registry, gateway.as_ref(), WsTransport::new(ws), participant, room_id, &config)
        .await?;
    Ok(())
}

/// Parse `/ws/{room_id}/{participant}` into its parts.
fn parse_path(path: &str) -> Option<(RoomId, ParticipantId)> {
    let mut parts = path.trim_start_matches('/').split('/');
    if parts.next()? != "ws" {
        return None;
    }
    let room_id = parts.next()?.parse().ok()?;
    let participant = parts.next()?;
    if participant.is_empty() || parts.next().is_some() {
        return None;
    }
    Some((room_id, participant.to_string()))
}

fn bad_request(reason: String) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
}
