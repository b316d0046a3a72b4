//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::get,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{domain::MessagePusher, relay::RelayHandle};

use super::{
    handler::{
        http::{get_room_detail, get_rooms, health_check},
        websocket::websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Order-location relay server.
///
/// This struct encapsulates the server configuration and provides methods to
/// run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(relay, pusher, "http://localhost:5173".to_string());
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    /// Handle to the relay task
    relay: RelayHandle,
    /// MessagePusher shared with the connection handlers
    pusher: Arc<dyn MessagePusher>,
    /// The one origin allowed to open browser handshakes
    allowed_origin: String,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `relay` - Handle to the running relay task
    /// * `pusher` - Message pusher the relay delivers through
    /// * `allowed_origin` - Origin allowed by the CORS layer (GET/POST)
    pub fn new(relay: RelayHandle, pusher: Arc<dyn MessagePusher>, allowed_origin: String) -> Self {
        Self {
            relay,
            pusher,
            allowed_origin,
        }
    }

    /// Run the relay server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the allowed origin is not a valid header value,
    /// if the server fails to bind to the specified address or if there's an
    /// error during server execution.
    pub async fn run(
        self,
        host: String,
        port: u16,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let relay = self.relay.clone();
        let app_state = Arc::new(AppState {
            relay: self.relay,
            pusher: self.pusher,
        });

        // Browsers enforce the allow-list; non-browser clients send no
        // Origin header and pass through, same as the previous deployment.
        let origin: HeaderValue = self.allowed_origin.parse()?;
        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST]);

        // Define handlers
        let app = Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .route("/api/rooms/{order_id}", get(get_room_detail))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(app_state);

        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        // Start the server
        tracing::info!(
            "Order location relay listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        // Set up graceful shutdown signal handler
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // Drop every tracked connection and clear both maps before exiting
        relay.shutdown();

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
