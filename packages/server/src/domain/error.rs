//! Error types for the domain layer.

use thiserror::Error;

/// Validation errors for client-supplied values.
///
/// The wire protocol is fire-and-forget, so these are never returned to a
/// client; handlers log them and drop the offending event.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Order identifier was empty
    #[error("order id must not be empty")]
    EmptyOrderId,

    /// Latitude or longitude was NaN or infinite
    #[error("coordinate field '{field}' is not finite: {value}")]
    NonFiniteCoordinate { field: &'static str, value: f64 },
}
