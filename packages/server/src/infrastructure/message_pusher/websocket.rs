//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を管理
//! - 接続へのメッセージ送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`crate::ui::handler::websocket`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、メッセージ送信に使用します。
//! sender を drop すると接続側の pusher ループが終了し、ソケットが閉じられる
//! ため、`unregister_all` がシャットダウン時の接続破棄を兼ねます。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};

/// WebSocket message pusher keyed by connection identity.
#[derive(Debug, Default)]
pub struct WebSocketMessagePusher {
    /// Sender channels of the currently connected clients
    clients: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        clients.insert(connection_id, sender);
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
    }

    async fn unregister_client(&self, connection_id: ConnectionId) {
        let mut clients = self.clients.lock().await;
        clients.remove(&connection_id);
        tracing::debug!(
            "Connection '{}' unregistered from MessagePusher",
            connection_id
        );
    }

    async fn unregister_all(&self) {
        let mut clients = self.clients.lock().await;
        let count = clients.len();
        clients.clear();
        tracing::debug!("Dropped {} tracked connection(s)", count);
    }

    async fn push_to(
        &self,
        connection_id: ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        let Some(sender) = clients.get(&connection_id) else {
            return Err(MessagePushError::ClientNotFound(connection_id));
        };

        sender
            .send(content.to_string())
            .map_err(|_| MessagePushError::PushFailed(connection_id))?;
        tracing::debug!("Pushed message to connection '{}'", connection_id);
        Ok(())
    }

    async fn broadcast(&self, targets: Vec<ConnectionId>, content: &str) {
        let clients = self.clients.lock().await;

        for target in targets {
            let Some(sender) = clients.get(&target) else {
                tracing::warn!("Connection '{}' not found during broadcast, skipping", target);
                continue;
            };

            // 一部の送信失敗は許容し、残りのメンバーへの配信を続ける
            if sender.send(content.to_string()).is_err() {
                tracing::warn!("Failed to push message to connection '{}'", target);
            } else {
                tracing::debug!("Broadcasted message to connection '{}'", target);
            }
        }
    }
}
