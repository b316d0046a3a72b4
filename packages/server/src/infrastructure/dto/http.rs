//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// One room in the `/api/rooms` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub order_id: String,
    /// Member connection ids, sorted
    pub members: Vec<String>,
}

/// Room detail for `/api/rooms/{order_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub order_id: String,
    pub members: Vec<String>,
    /// Last reported position, absent if nothing was ever reported
    pub last_location: Option<LocationDto>,
}

/// Cached location with its receipt time (diagnostics only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationDto {
    pub lat: f64,
    pub lng: f64,
    /// Receipt time in JST RFC 3339 format
    pub recorded_at: String,
}
