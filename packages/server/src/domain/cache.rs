//! Last-known-location cache.
//!
//! Keyed by order identifier, overwritten on every report (last-writer-wins,
//! no sequence numbers). Disconnects never touch it, so a viewer joining
//! after the delivery partner dropped off still gets the latest position.

use std::collections::HashMap;

use super::value_object::{LocationRecord, OrderId};

/// In-memory map from order identifier to the most recent location report.
///
/// Like the registry, this is owned by the relay task alone. There is no
/// automatic eviction; `remove` is the hook for an external order-completion
/// signal (see DESIGN.md).
#[derive(Debug, Default)]
pub struct LocationCache {
    records: HashMap<OrderId, LocationRecord>,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditionally overwrite the record for an order.
    pub fn set(&mut self, order_id: OrderId, record: LocationRecord) {
        self.records.insert(order_id, record);
    }

    /// Current record for an order, `None` if nothing was ever reported.
    pub fn get(&self, order_id: &OrderId) -> Option<&LocationRecord> {
        self.records.get(order_id)
    }

    /// Evict the record for an order; no-op if absent.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<LocationRecord> {
        self.records.remove(order_id)
    }

    /// Drop every record; shutdown support.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
