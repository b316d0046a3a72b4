//! Conversion logic between DTOs and domain values.

use todoke_shared::time::timestamp_to_jst_rfc3339;

use crate::domain::{Coordinate, LocationRecord};
use crate::relay::RoomSnapshot;

use super::http::{LocationDto, RoomDetailDto, RoomSummaryDto};
use super::websocket::ServerMessage;

// ========================================
// Domain → WebSocket DTO
// ========================================

impl From<Coordinate> for ServerMessage {
    fn from(coordinate: Coordinate) -> Self {
        Self::LocationUpdate {
            lat: coordinate.lat(),
            lng: coordinate.lng(),
        }
    }
}

// ========================================
// Domain → HTTP DTO
// ========================================

impl From<LocationRecord> for LocationDto {
    fn from(record: LocationRecord) -> Self {
        Self {
            lat: record.coordinate.lat(),
            lng: record.coordinate.lng(),
            recorded_at: timestamp_to_jst_rfc3339(record.recorded_at.value()),
        }
    }
}

impl From<&RoomSnapshot> for RoomSummaryDto {
    fn from(snapshot: &RoomSnapshot) -> Self {
        Self {
            order_id: snapshot.order_id.as_str().to_string(),
            members: snapshot
                .members
                .iter()
                .map(|connection_id| connection_id.to_string())
                .collect(),
        }
    }
}

impl From<&RoomSnapshot> for RoomDetailDto {
    fn from(snapshot: &RoomSnapshot) -> Self {
        Self {
            order_id: snapshot.order_id.as_str().to_string(),
            members: snapshot
                .members
                .iter()
                .map(|connection_id| connection_id.to_string())
                .collect(),
            last_location: snapshot.last_location.map(LocationDto::from),
        }
    }
}
