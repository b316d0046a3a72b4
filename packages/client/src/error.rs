//! Error types for the tracking client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A typed position line could not be parsed
    #[error("Invalid input '{0}': expected \"lat,lng\" with numeric fields")]
    InvalidInput(String),
}
