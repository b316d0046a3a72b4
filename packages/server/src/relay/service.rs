//! The relay service task and its handle.
//!
//! `RelayService` is the single owner of the room registry and the location
//! cache: it drains a command queue and applies one command at a time, so no
//! lock is ever taken on the shared maps. `RelayHandle` is the cloneable
//! sender side passed into every connection handler.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use todoke_shared::time::Clock;

use crate::{
    domain::{
        ConnectionId, Coordinate, LocationCache, LocationRecord, MessagePusher, OrderId,
        RoomRegistry, Timestamp,
    },
    infrastructure::dto::websocket::ServerMessage,
};

use super::command::{RelayCommand, RoomSnapshot};

/// Cloneable handle for sending commands to the relay task.
///
/// Fire-and-forget operations return immediately; if the relay task is gone
/// (after shutdown) the command is logged and dropped, mirroring the
/// protocol's lack of a failure surface.
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::UnboundedSender<RelayCommand>,
}

impl RelayHandle {
    fn send(&self, command: RelayCommand) {
        if self.tx.send(command).is_err() {
            tracing::warn!("Relay task is not running, command dropped");
        }
    }

    /// Subscribe a connection to an order's room.
    pub fn join(&self, connection_id: ConnectionId, order_id: OrderId) {
        self.send(RelayCommand::Join {
            connection_id,
            order_id,
        });
    }

    /// Unsubscribe a connection from one room.
    pub fn leave(&self, connection_id: ConnectionId, order_id: OrderId) {
        self.send(RelayCommand::Leave {
            connection_id,
            order_id,
        });
    }

    /// Remove a connection from every room; called on disconnect.
    pub fn leave_all(&self, connection_id: ConnectionId) {
        self.send(RelayCommand::LeaveAll { connection_id });
    }

    /// Report a location for an order.
    pub fn update(&self, sender_id: ConnectionId, order_id: OrderId, coordinate: Coordinate) {
        self.send(RelayCommand::Update {
            sender_id,
            order_id,
            coordinate,
        });
    }

    /// Evict the cached location for an order.
    ///
    /// Hook for an external order-completion signal; the wire protocol never
    /// sends this.
    pub fn remove_location(&self, order_id: OrderId) {
        self.send(RelayCommand::RemoveLocation { order_id });
    }

    /// Snapshot of every room with at least one member.
    pub async fn rooms(&self) -> Vec<RoomSnapshot> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(RelayCommand::GetRooms { reply }).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Snapshot of one room, `None` when it has neither members nor a
    /// cached location.
    pub async fn room_detail(&self, order_id: OrderId) -> Option<RoomSnapshot> {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(RelayCommand::GetRoomDetail { order_id, reply })
            .is_err()
        {
            return None;
        }
        rx.await.unwrap_or(None)
    }

    /// Drop all tracked connections, clear both maps and stop the task.
    pub fn shutdown(&self) {
        self.send(RelayCommand::Shutdown);
    }
}

/// Single owner of the room registry and the location cache.
pub struct RelayService {
    registry: RoomRegistry,
    cache: LocationCache,
    pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    rx: mpsc::UnboundedReceiver<RelayCommand>,
}

impl RelayService {
    /// Create a service with empty maps and the handle to command it.
    pub fn new(pusher: Arc<dyn MessagePusher>, clock: Arc<dyn Clock>) -> (Self, RelayHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = Self {
            registry: RoomRegistry::new(),
            cache: LocationCache::new(),
            pusher,
            clock,
            rx,
        };
        (service, RelayHandle { tx })
    }

    /// Create a service and run it on a freshly spawned task.
    pub fn spawn(pusher: Arc<dyn MessagePusher>, clock: Arc<dyn Clock>) -> RelayHandle {
        let (service, handle) = Self::new(pusher, clock);
        tokio::spawn(service.run());
        handle
    }

    /// Process commands until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!("Relay task started");
        while let Some(command) = self.rx.recv().await {
            if self.apply(command).await {
                break;
            }
        }
        tracing::info!("Relay task stopped");
    }

    /// Apply one command; returns `true` when the task should stop.
    async fn apply(&mut self, command: RelayCommand) -> bool {
        match command {
            RelayCommand::Join {
                connection_id,
                order_id,
            } => {
                if self.registry.join(connection_id, order_id.clone()) {
                    tracing::info!("Connection '{}' joined room '{}'", connection_id, order_id);
                } else {
                    tracing::debug!(
                        "Connection '{}' re-joined room '{}'",
                        connection_id,
                        order_id
                    );
                }

                // Late joiners get the last known position immediately,
                // unicast to this connection only.
                if let Some(record) = self.cache.get(&order_id)
                    && let Some(payload) = serialize_location(record.coordinate)
                    && let Err(e) = self.pusher.push_to(connection_id, &payload).await
                {
                    tracing::warn!(
                        "Failed to replay cached location for room '{}': {}",
                        order_id,
                        e
                    );
                }
            }
            RelayCommand::Leave {
                connection_id,
                order_id,
            } => {
                self.registry.leave(connection_id, &order_id);
                tracing::info!("Connection '{}' left room '{}'", connection_id, order_id);
            }
            RelayCommand::LeaveAll { connection_id } => {
                self.registry.leave_all(connection_id);
                tracing::info!("Connection '{}' removed from all rooms", connection_id);
            }
            RelayCommand::Update {
                sender_id,
                order_id,
                coordinate,
            } => {
                tracing::debug!(
                    "Location update for order '{}' from '{}': {}, {}",
                    order_id,
                    sender_id,
                    coordinate.lat(),
                    coordinate.lng()
                );

                let recorded_at = Timestamp::new(self.clock.now_jst_millis());
                self.cache
                    .set(order_id.clone(), LocationRecord::new(coordinate, recorded_at));

                let members = self.registry.members_of(&order_id);
                if members.is_empty() {
                    tracing::debug!("Room '{}' has no members, cached only", order_id);
                } else if let Some(payload) = serialize_location(coordinate) {
                    // The sender is itself a room member and receives its
                    // own update back; the protocol has no sender exclusion.
                    self.pusher.broadcast(members, &payload).await;
                }
            }
            RelayCommand::RemoveLocation { order_id } => {
                if self.cache.remove(&order_id).is_some() {
                    tracing::info!("Evicted cached location for order '{}'", order_id);
                }
            }
            RelayCommand::GetRooms { reply } => {
                let snapshots = self
                    .registry
                    .rooms()
                    .into_iter()
                    .map(|order_id| self.snapshot_room(&order_id))
                    .collect();
                let _ = reply.send(snapshots);
            }
            RelayCommand::GetRoomDetail { order_id, reply } => {
                let snapshot = self.snapshot_room(&order_id);
                let result = if snapshot.members.is_empty() && snapshot.last_location.is_none() {
                    None
                } else {
                    Some(snapshot)
                };
                let _ = reply.send(result);
            }
            RelayCommand::Shutdown => {
                self.pusher.unregister_all().await;
                self.registry.clear();
                self.cache.clear();
                tracing::info!("Relay shut down: connections dropped, rooms and cache cleared");
                return true;
            }
        }

        false
    }

    fn snapshot_room(&self, order_id: &OrderId) -> RoomSnapshot {
        let mut members = self.registry.members_of(order_id);
        members.sort();
        RoomSnapshot {
            order_id: order_id.clone(),
            members,
            last_location: self.cache.get(order_id).copied(),
        }
    }
}

fn serialize_location(coordinate: Coordinate) -> Option<String> {
    match serde_json::to_string(&ServerMessage::from(coordinate)) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::error!("Failed to serialize location update: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::MockMessagePusher, infrastructure::message_pusher::WebSocketMessagePusher,
    };
    use serde_json::Value;
    use todoke_shared::time::FixedClock;

    const FIXED_TIME: i64 = 1_700_000_000_000;

    fn order(id: &str) -> OrderId {
        OrderId::new(id.to_string()).unwrap()
    }

    fn coordinate(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn spawn_relay() -> (RelayHandle, Arc<WebSocketMessagePusher>) {
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let handle = RelayService::spawn(pusher.clone(), Arc::new(FixedClock::new(FIXED_TIME)));
        (handle, pusher)
    }

    async fn connect(
        pusher: &WebSocketMessagePusher,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let connection_id = ConnectionId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        pusher.register_client(connection_id, tx).await;
        (connection_id, rx)
    }

    /// Commands are processed in order, so a completed query implies every
    /// earlier command has been applied.
    async fn sync(handle: &RelayHandle) {
        let _ = handle.rooms().await;
    }

    fn recv_json(rx: &mut mpsc::UnboundedReceiver<String>) -> Option<Value> {
        rx.try_recv()
            .ok()
            .map(|text| serde_json::from_str(&text).unwrap())
    }

    #[tokio::test]
    async fn test_join_without_cached_location_receives_no_replay() {
        // テスト項目: 位置情報が未報告の注文に join しても何も受信しない
        // given (前提条件):
        let (handle, pusher) = spawn_relay();
        let (viewer, mut viewer_rx) = connect(&pusher).await;

        // when (操作):
        handle.join(viewer, order("order-42"));
        sync(&handle).await;

        // then (期待する結果):
        assert!(recv_json(&mut viewer_rx).is_none());
    }

    #[tokio::test]
    async fn test_update_broadcasts_to_all_members_including_sender() {
        // テスト項目: 位置報告がルーム全員（送信者含む）にブロードキャストされる
        // given (前提条件):
        let (handle, pusher) = spawn_relay();
        let (viewer, mut viewer_rx) = connect(&pusher).await;
        let (partner, mut partner_rx) = connect(&pusher).await;
        handle.join(viewer, order("order-42"));
        handle.join(partner, order("order-42"));

        // when (操作):
        handle.update(partner, order("order-42"), coordinate(12.9, 77.6));
        sync(&handle).await;

        // then (期待する結果):
        for rx in [&mut viewer_rx, &mut partner_rx] {
            let message = recv_json(rx).expect("every member receives the broadcast");
            assert_eq!(message["type"], "location-update");
            assert_eq!(message["lat"], 12.9);
            assert_eq!(message["lng"], 77.6);
        }
    }

    #[tokio::test]
    async fn test_late_joiner_receives_cached_replay() {
        // テスト項目: 報告済みの注文に後から join した接続は即座に最新位置を受信する
        // given (前提条件):
        let (handle, pusher) = spawn_relay();
        let (partner, _partner_rx) = connect(&pusher).await;
        handle.join(partner, order("order-42"));
        handle.update(partner, order("order-42"), coordinate(12.9, 77.6));

        // when (操作):
        let (late_viewer, mut late_rx) = connect(&pusher).await;
        handle.join(late_viewer, order("order-42"));
        sync(&handle).await;

        // then (期待する結果): 新しい報告なしで最新位置がユニキャストされる
        let message = recv_json(&mut late_rx).expect("late joiner receives the cached location");
        assert_eq!(message["type"], "location-update");
        assert_eq!(message["lat"], 12.9);
        assert_eq!(message["lng"], 77.6);
        assert!(recv_json(&mut late_rx).is_none());
    }

    #[tokio::test]
    async fn test_cache_survives_disconnect() {
        // テスト項目: 報告者が切断してもキャッシュは残り、後続の join に再生される
        // given (前提条件):
        let (handle, pusher) = spawn_relay();
        let (partner, _partner_rx) = connect(&pusher).await;
        handle.join(partner, order("order-42"));
        handle.update(partner, order("order-42"), coordinate(12.9, 77.6));

        // when (操作): 報告者が切断される
        pusher.unregister_client(partner).await;
        handle.leave_all(partner);
        let (viewer, mut viewer_rx) = connect(&pusher).await;
        handle.join(viewer, order("order-42"));
        sync(&handle).await;

        // then (期待する結果):
        let message = recv_json(&mut viewer_rx).expect("cache outlives the reporter");
        assert_eq!(message["lat"], 12.9);
        assert_eq!(message["lng"], 77.6);
    }

    #[tokio::test]
    async fn test_last_writer_wins_across_updates() {
        // テスト項目: 同じ注文への連続報告は最後の値だけがキャッシュに残る
        // given (前提条件):
        let (handle, pusher) = spawn_relay();
        let (partner, _partner_rx) = connect(&pusher).await;
        handle.join(partner, order("order-42"));
        handle.update(partner, order("order-42"), coordinate(12.9, 77.6));
        handle.update(partner, order("order-42"), coordinate(13.0, 77.7));
        handle.update(partner, order("order-42"), coordinate(13.1, 77.8));

        // when (操作):
        let detail = handle.room_detail(order("order-42")).await.unwrap();

        // then (期待する結果):
        let record = detail.last_location.unwrap();
        assert_eq!(record.coordinate.lat(), 13.1);
        assert_eq!(record.coordinate.lng(), 77.8);
        assert_eq!(record.recorded_at.value(), FIXED_TIME);
    }

    #[tokio::test]
    async fn test_update_does_not_cross_rooms() {
        // テスト項目: ルーム B への報告がルーム A のメンバーに届かない
        // given (前提条件):
        let (handle, pusher) = spawn_relay();
        let (viewer_a, mut viewer_a_rx) = connect(&pusher).await;
        let (partner_b, mut partner_b_rx) = connect(&pusher).await;
        handle.join(viewer_a, order("order-a"));
        handle.join(partner_b, order("order-b"));

        // when (操作):
        handle.update(partner_b, order("order-b"), coordinate(35.6, 139.7));
        sync(&handle).await;

        // then (期待する結果):
        assert!(recv_json(&mut viewer_a_rx).is_none());
        assert!(recv_json(&mut partner_b_rx).is_some());
    }

    #[tokio::test]
    async fn test_leave_all_removes_membership() {
        // テスト項目: leave_all 後の接続はどのルームのブロードキャストも受信しない
        // given (前提条件):
        let (handle, pusher) = spawn_relay();
        let (viewer, mut viewer_rx) = connect(&pusher).await;
        let (partner, _partner_rx) = connect(&pusher).await;
        handle.join(viewer, order("order-1"));
        handle.join(viewer, order("order-2"));
        handle.join(partner, order("order-1"));

        // when (操作):
        handle.leave_all(viewer);
        handle.update(partner, order("order-1"), coordinate(12.9, 77.6));
        sync(&handle).await;

        // then (期待する結果):
        assert!(recv_json(&mut viewer_rx).is_none());
        let rooms = handle.rooms().await;
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].order_id, order("order-1"));
        assert_eq!(rooms[0].members, vec![partner]);
    }

    #[tokio::test]
    async fn test_leave_stops_delivery_to_that_connection() {
        // テスト項目: 片方のルームだけ leave した接続は残りのルームの報告のみ受信する
        // given (前提条件):
        let (handle, pusher) = spawn_relay();
        let (viewer, mut viewer_rx) = connect(&pusher).await;
        let (partner, _partner_rx) = connect(&pusher).await;
        handle.join(viewer, order("order-1"));
        handle.join(viewer, order("order-2"));

        // when (操作):
        handle.leave(viewer, order("order-1"));
        handle.update(partner, order("order-1"), coordinate(12.9, 77.6));
        handle.update(partner, order("order-2"), coordinate(35.6, 139.7));
        sync(&handle).await;

        // then (期待する結果): order-2 の報告だけが届く
        let message = recv_json(&mut viewer_rx).unwrap();
        assert_eq!(message["lat"], 35.6);
        assert!(recv_json(&mut viewer_rx).is_none());
    }

    #[tokio::test]
    async fn test_rejoin_does_not_duplicate_delivery() {
        // テスト項目: 再 join してもブロードキャストが二重に届かない
        // given (前提条件):
        let (handle, pusher) = spawn_relay();
        let (viewer, mut viewer_rx) = connect(&pusher).await;
        let (partner, _partner_rx) = connect(&pusher).await;
        handle.join(viewer, order("order-42"));
        handle.join(viewer, order("order-42"));

        // when (操作):
        handle.update(partner, order("order-42"), coordinate(12.9, 77.6));
        sync(&handle).await;

        // then (期待する結果):
        assert!(recv_json(&mut viewer_rx).is_some());
        assert!(recv_json(&mut viewer_rx).is_none());
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_block_other_members() {
        // テスト項目: 一人への配信失敗が他のメンバーへの配信を妨げない
        // given (前提条件):
        let (handle, pusher) = spawn_relay();
        let (dead_viewer, dead_rx) = connect(&pusher).await;
        let (live_viewer, mut live_rx) = connect(&pusher).await;
        handle.join(dead_viewer, order("order-42"));
        handle.join(live_viewer, order("order-42"));

        // when (操作): 片方の受信チャンネルを閉じてから報告する
        drop(dead_rx);
        handle.update(live_viewer, order("order-42"), coordinate(12.9, 77.6));
        sync(&handle).await;

        // then (期待する結果):
        let message = recv_json(&mut live_rx).expect("healthy member still receives the update");
        assert_eq!(message["lat"], 12.9);
    }

    #[tokio::test]
    async fn test_update_with_no_members_only_caches() {
        // テスト項目: メンバー不在のルームへの報告はキャッシュのみ更新する
        // given (前提条件):
        let (handle, pusher) = spawn_relay();
        let (partner, _partner_rx) = connect(&pusher).await;

        // when (操作): 報告者自身も join していない
        handle.update(partner, order("order-42"), coordinate(12.9, 77.6));

        // then (期待する結果): ルーム一覧には現れず、キャッシュは参照できる
        assert!(handle.rooms().await.is_empty());
        let detail = handle.room_detail(order("order-42")).await.unwrap();
        assert!(detail.members.is_empty());
        assert_eq!(detail.last_location.unwrap().coordinate.lat(), 12.9);
    }

    #[tokio::test]
    async fn test_remove_location_evicts_cache() {
        // テスト項目: remove_location 後の join には再生が行われない
        // given (前提条件):
        let (handle, pusher) = spawn_relay();
        let (partner, _partner_rx) = connect(&pusher).await;
        handle.update(partner, order("order-42"), coordinate(12.9, 77.6));

        // when (操作):
        handle.remove_location(order("order-42"));
        let (viewer, mut viewer_rx) = connect(&pusher).await;
        handle.join(viewer, order("order-42"));
        sync(&handle).await;

        // then (期待する結果):
        assert!(recv_json(&mut viewer_rx).is_none());
        let detail = handle.room_detail(order("order-42")).await.unwrap();
        assert!(detail.last_location.is_none());
    }

    #[tokio::test]
    async fn test_unknown_room_detail_is_none() {
        // テスト項目: メンバーもキャッシュもないルームの詳細は None になる
        // given (前提条件):
        let (handle, _pusher) = spawn_relay();

        // when (操作):
        let detail = handle.room_detail(order("order-404")).await;

        // then (期待する結果):
        assert!(detail.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_clears_state_and_connections() {
        // テスト項目: shutdown で全接続が破棄され、タスクが停止する
        // given (前提条件):
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let (service, handle) =
            RelayService::new(pusher.clone(), Arc::new(FixedClock::new(FIXED_TIME)));
        let task = tokio::spawn(service.run());
        let (partner, _partner_rx) = connect(&pusher).await;
        handle.join(partner, order("order-42"));
        handle.update(partner, order("order-42"), coordinate(12.9, 77.6));
        sync(&handle).await;

        // when (操作):
        handle.shutdown();
        task.await.unwrap();

        // then (期待する結果): 接続は登録解除され、以降のコマンドは破棄される
        assert!(pusher.push_to(partner, "{}").await.is_err());
        assert!(handle.rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_join_replay_unicasts_to_joiner_only() {
        // テスト項目: 再生はブロードキャストではなく join した接続へのユニキャストである
        // given (前提条件):
        let viewer = ConnectionId::generate();
        let mut mock = MockMessagePusher::new();
        // Join 時の push_to は一度だけ。broadcast への期待を登録しないので、
        // 呼ばれた場合はテストが失敗する。
        mock.expect_push_to()
            .withf(move |connection_id, _| *connection_id == viewer)
            .times(1)
            .returning(|_, _| Ok(()));

        let (mut service, _handle) =
            RelayService::new(Arc::new(mock), Arc::new(FixedClock::new(FIXED_TIME)));

        // when (操作): メンバー不在のまま報告し、その後 join する
        let partner = ConnectionId::generate();
        service
            .apply(RelayCommand::Update {
                sender_id: partner,
                order_id: order("order-42"),
                coordinate: coordinate(12.9, 77.6),
            })
            .await;
        service
            .apply(RelayCommand::Join {
                connection_id: viewer,
                order_id: order("order-42"),
            })
            .await;

        // then (期待する結果): mock の期待が検証される（drop 時）
    }
}
