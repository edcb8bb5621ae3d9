//! Souk chat server binary.
//!
//! # Usage
//!
//! ```bash
//! # Serve rooms 1, 2 and 3 from the in-memory development gateway
//! souk-server --bind 0.0.0.0:8090 --rooms 1,2,3
//! ```
//!
//! Clients connect with a websocket upgrade to `/ws/{room_id}/{participant}`.

use std::sync::Arc;

use clap::Parser;
use souk_chat::{ChatConfig, MemoryGateway};
use souk_server::{Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Souk marketplace real-time chat server
#[derive(Parser, Debug)]
#[command(name = "souk-server")]
#[command(about = "Souk marketplace real-time chat server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8090")]
    bind: String,

    /// Room identifiers to seed into the development gateway
    #[arg(long, value_delimiter = ',', default_value = "1")]
    rooms: Vec<u64>,

    /// Capacity of each session's outbound mailbox
    #[arg(long, default_value = "256")]
    mailbox_capacity: usize,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Souk chat server starting");
    tracing::warn!("Using the in-memory gateway - messages do not survive restarts");

    let gateway = MemoryGateway::new();
    for room_id in &args.rooms {
        gateway.add_room(*room_id, &format!("room {room_id}"));
    }

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        chat: ChatConfig {
            mailbox_capacity: args.mailbox_capacity,
            max_connections: args.max_connections,
        },
    };

    let server = Server::bind(config, Arc::new(gateway)).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
