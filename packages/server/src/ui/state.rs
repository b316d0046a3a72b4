//! Server state shared across connection handlers.

use std::sync::Arc;

use crate::{domain::MessagePusher, relay::RelayHandle};

/// Shared application state
pub struct AppState {
    /// Handle to the relay task (single owner of rooms and cached locations)
    pub relay: RelayHandle,
    /// MessagePusher（メッセージ通知の抽象化）
    pub pusher: Arc<dyn MessagePusher>,
}
