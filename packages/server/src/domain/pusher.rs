//! メッセージ送信（通知）の抽象化
//!
//! ドメイン層が必要とするメッセージ配信のインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tokio::sync::mpsc;

use super::value_object::ConnectionId;

/// Channel used to push serialized messages to one connection's socket task.
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// Errors raised when pushing a message to a connection.
#[derive(Debug, Error)]
pub enum MessagePushError {
    /// The connection is not registered (already disconnected)
    #[error("connection '{0}' is not registered")]
    ClientNotFound(ConnectionId),

    /// The connection's channel is closed
    #[error("failed to push message to connection '{0}'")]
    PushFailed(ConnectionId),
}

/// Message delivery abstraction.
///
/// The relay task depends on this trait and not on the WebSocket
/// implementation, which keeps the dispatch logic testable.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Register a connection's sender channel.
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// Unregister a connection's sender channel.
    async fn unregister_client(&self, connection_id: ConnectionId);

    /// Unregister every connection, closing their channels; shutdown support.
    async fn unregister_all(&self);

    /// Deliver a message to exactly one connection (unicast replay).
    async fn push_to(
        &self,
        connection_id: ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// Deliver a message to every target connection.
    ///
    /// A failed delivery to one target must not prevent delivery to the
    /// others; failures are logged and swallowed.
    async fn broadcast(&self, targets: Vec<ConnectionId>, content: &str);
}
