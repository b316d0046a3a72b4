//! Room membership registry.
//!
//! A room is the set of connections subscribed to one order's tracking
//! channel. Rooms are created implicitly on first join and never destroyed
//! explicitly; an absent room and an empty room are equivalent states.

use std::collections::{HashMap, HashSet};

use super::value_object::{ConnectionId, OrderId};

/// Mapping from order identifier to the set of subscribed connections.
///
/// Plain synchronous data structure; the relay task is its single owner, so
/// no locking is needed (see `crate::relay`).
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<OrderId, HashSet<ConnectionId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room, creating the room on first join.
    ///
    /// Idempotent: rejoining is a no-op beyond re-affirming membership.
    /// Returns `true` if the connection was not already a member.
    pub fn join(&mut self, connection_id: ConnectionId, order_id: OrderId) -> bool {
        self.rooms.entry(order_id).or_default().insert(connection_id)
    }

    /// Remove a connection from a room; no-op if it was not a member.
    pub fn leave(&mut self, connection_id: ConnectionId, order_id: &OrderId) {
        if let Some(members) = self.rooms.get_mut(order_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                self.rooms.remove(order_id);
            }
        }
    }

    /// Remove a connection from every room; used exclusively on disconnect.
    pub fn leave_all(&mut self, connection_id: ConnectionId) {
        self.rooms.retain(|_, members| {
            members.remove(&connection_id);
            !members.is_empty()
        });
    }

    /// Current members of a room, empty for an unknown room.
    pub fn members_of(&self, order_id: &OrderId) -> Vec<ConnectionId> {
        self.rooms
            .get(order_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Order identifiers of all rooms with at least one member, sorted.
    pub fn rooms(&self) -> Vec<OrderId> {
        let mut order_ids: Vec<OrderId> = self.rooms.keys().cloned().collect();
        order_ids.sort();
        order_ids
    }

    /// Drop every room; shutdown support.
    pub fn clear(&mut self) {
        self.rooms.clear();
    }
}
