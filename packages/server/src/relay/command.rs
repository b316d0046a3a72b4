//! Commands processed by the relay task.
//!
//! Every mutation of the room registry or the location cache travels through
//! this queue and is applied by one task, which makes the serialization of
//! shared-state access structural rather than lock-based.

use tokio::sync::oneshot;

use crate::domain::{ConnectionId, Coordinate, LocationRecord, OrderId};

/// A command for the relay task.
#[derive(Debug)]
pub enum RelayCommand {
    /// Subscribe a connection to an order's room; replays the cached
    /// location to that connection alone if one exists.
    Join {
        connection_id: ConnectionId,
        order_id: OrderId,
    },

    /// Unsubscribe a connection from one room.
    Leave {
        connection_id: ConnectionId,
        order_id: OrderId,
    },

    /// Remove a connection from every room; sent on disconnect.
    /// The location cache is deliberately left untouched.
    LeaveAll { connection_id: ConnectionId },

    /// A location report from a delivery partner: overwrite the cache and
    /// broadcast to the whole room, sender included.
    Update {
        sender_id: ConnectionId,
        order_id: OrderId,
        coordinate: Coordinate,
    },

    /// Evict the cached location for an order (hook for an external
    /// order-completion signal; nothing on the wire protocol sends this).
    RemoveLocation { order_id: OrderId },

    /// Snapshot of every room with at least one member.
    GetRooms {
        reply: oneshot::Sender<Vec<RoomSnapshot>>,
    },

    /// Snapshot of one room; `None` when it has neither members nor a
    /// cached location.
    GetRoomDetail {
        order_id: OrderId,
        reply: oneshot::Sender<Option<RoomSnapshot>>,
    },

    /// Drop all tracked connections and clear both maps, then stop.
    Shutdown,
}

/// Read-only view of one room, answered by the relay task.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub order_id: OrderId,
    /// Member connection ids, sorted for stable output
    pub members: Vec<ConnectionId>,
    pub last_location: Option<LocationRecord>,
}
