//! Realtime order-location relay server.
//!
//! Delivery partners stream GPS positions for an order over WebSocket; the
//! relay broadcasts them to everyone tracking that order and replays the
//! last known position to late joiners.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin todoke-server
//! cargo run --bin todoke-server -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;

use clap::Parser;

use todoke_server::{
    domain::MessagePusher, infrastructure::message_pusher::WebSocketMessagePusher,
    relay::RelayService, ui::Server,
};
use todoke_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Realtime order-location relay server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Origin allowed to open browser handshakes (the tracking frontend)
    #[arg(short = 'o', long, default_value = "http://localhost:5173")]
    allowed_origin: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. MessagePusher
    // 2. Relay task (single owner of rooms and cached locations)
    // 3. Server

    // 1. Create MessagePusher (WebSocket implementation)
    let pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());

    // 2. Spawn the relay task with empty maps
    let relay = RelayService::spawn(pusher.clone(), Arc::new(SystemClock));

    // 3. Create and run the server
    let server = Server::new(relay, pusher, args.allowed_origin);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
