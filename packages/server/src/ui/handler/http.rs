//! HTTP API endpoint handlers.
//!
//! Read-only diagnostics next to the WebSocket endpoint; all answers are
//! snapshots taken by the relay task.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::OrderId,
    infrastructure::dto::http::{RoomDetailDto, RoomSummaryDto},
};

use super::super::state::AppState;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of rooms with at least one subscriber
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let snapshots = state.relay.rooms().await;

    // Domain Model から DTO への変換
    let summaries: Vec<RoomSummaryDto> = snapshots.iter().map(RoomSummaryDto::from).collect();

    Json(summaries)
}

/// Get room detail (members and cached location) by order id
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    let order_id = OrderId::new(order_id).map_err(|_| StatusCode::BAD_REQUEST)?;

    match state.relay.room_detail(order_id).await {
        Some(snapshot) => Ok(Json(RoomDetailDto::from(&snapshot))),
        None => Err(StatusCode::NOT_FOUND),
    }
}
