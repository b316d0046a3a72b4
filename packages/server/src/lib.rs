//! Realtime order-location relay server.
//!
//! One delivery-partner client streams GPS coordinates for an order over
//! WebSocket; the relay fans them out to every viewer subscribed to that
//! order's room and replays the last known position to late joiners.

// layers
pub mod domain;
pub mod infrastructure;
pub mod relay;
pub mod ui;
