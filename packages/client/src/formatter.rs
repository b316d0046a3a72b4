//! Message formatting utilities for client display.

use todoke_shared::time::timestamp_to_jst_rfc3339;

/// Formatter for the position stream shown in the terminal
pub struct UpdateFormatter;

impl UpdateFormatter {
    /// Format a received location update
    ///
    /// # Arguments
    ///
    /// * `order_id` - The tracked order
    /// * `lat` / `lng` - The reported position
    /// * `received_at` - Unix timestamp when the update arrived (milliseconds)
    pub fn format_location_update(order_id: &str, lat: f64, lng: f64, received_at: i64) -> String {
        format!(
            "\n← Order '{}' is at {}, {} (received at {})\n",
            order_id,
            lat,
            lng,
            timestamp_to_jst_rfc3339(received_at)
        )
    }

    /// Format a confirmation after publishing a position
    pub fn format_sent_confirmation(lat: f64, lng: f64, sent_at: i64) -> String {
        format!(
            "sent {}, {} at {}\n",
            lat,
            lng,
            timestamp_to_jst_rfc3339(sent_at)
        )
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}
