//! WebSocket wire protocol message types.
//!
//! JSON text frames tagged with `type`. Field names are camelCase on the
//! wire (`orderId`), matching what the frontend already sends. The protocol
//! is fire-and-forget in both directions: an unparseable frame is dropped by
//! the server with nothing returned to the sender.

use serde::{Deserialize, Serialize};

/// Message sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Subscribe to an order's tracking room.
    JoinRoom {
        #[serde(rename = "orderId")]
        order_id: String,
    },

    /// Report the delivery partner's current position for an order.
    LocationUpdate {
        #[serde(rename = "orderId")]
        order_id: String,
        lat: f64,
        lng: f64,
    },
}

/// Message sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// A position for the joined order: either the cached replay delivered
    /// to a single late joiner, or a live broadcast to the whole room.
    LocationUpdate { lat: f64, lng: f64 },
}
