//! CLI tracking client for the Todoke order-location relay.
//!
//! Joins an order's room and either follows the live position stream
//! (`track`) or publishes positions typed as "lat,lng" lines (`publish`).
//! Automatically reconnects on disconnection (max 5 attempts with 5 second
//! interval). A reconnected session is a brand-new connection; the server
//! replays the last known position on join.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin todoke-client -- --order-id order-42 track
//! cargo run --bin todoke-client -- -o order-42 publish
//! ```

use clap::{Parser, Subcommand};

use todoke_client::Mode;
use todoke_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(about = "Order tracking client for the Todoke relay", long_about = None)]
struct Args {
    /// Order identifier whose room to join
    #[arg(short = 'o', long)]
    order_id: String,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow the order's live position (viewer)
    Track,
    /// Stream positions for the order (delivery partner)
    Publish,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let mode = match args.command {
        Command::Track => Mode::Track,
        Command::Publish => Mode::Publish,
    };

    // Run the client
    if let Err(e) = todoke_client::run_client(args.url, args.order_id, mode).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
