//! Value objects for the order-location relay.

use std::fmt;

use uuid::Uuid;

use super::error::DomainError;

/// Identifier assigned to one live transport session.
///
/// Generated when the connection is accepted and never reused; a client that
/// reconnects gets a brand-new identity with no memory of the old one's room
/// memberships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh connection identity
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque order identifier supplied by clients.
///
/// The relay never validates it against an order store; the only rule is that
/// it must not be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(value: String) -> Result<Self, DomainError> {
        if value.is_empty() {
            return Err(DomainError::EmptyOrderId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A latitude/longitude pair with both fields guaranteed finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, DomainError> {
        if !lat.is_finite() {
            return Err(DomainError::NonFiniteCoordinate {
                field: "lat",
                value: lat,
            });
        }
        if !lng.is_finite() {
            return Err(DomainError::NonFiniteCoordinate {
                field: "lng",
                value: lng,
            });
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

/// Unix timestamp in JST (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// The most recently reported position for one order.
///
/// `recorded_at` is the receipt time, kept for diagnostics only; it is never
/// sent to clients and never consulted when overwriting (last-writer-wins).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationRecord {
    pub coordinate: Coordinate,
    pub recorded_at: Timestamp,
}

impl LocationRecord {
    pub fn new(coordinate: Coordinate, recorded_at: Timestamp) -> Self {
        Self {
            coordinate,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_generate_is_unique() {
        // テスト項目: 生成された ConnectionId が重複しない
        // given (前提条件):

        // when (操作):
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();

        // then (期待する結果):
        assert_ne!(a, b);
    }

    #[test]
    fn test_order_id_accepts_non_empty_string() {
        // テスト項目: 空でない文字列から OrderId が生成できる
        // given (前提条件):
        let value = "order-42".to_string();

        // when (操作):
        let order_id = OrderId::new(value);

        // then (期待する結果):
        assert_eq!(order_id.unwrap().as_str(), "order-42");
    }

    #[test]
    fn test_order_id_rejects_empty_string() {
        // テスト項目: 空文字列から OrderId は生成できない
        // given (前提条件):
        let value = String::new();

        // when (操作):
        let result = OrderId::new(value);

        // then (期待する結果):
        assert!(matches!(result, Err(DomainError::EmptyOrderId)));
    }

    #[test]
    fn test_coordinate_accepts_finite_values() {
        // テスト項目: 有限の緯度経度から Coordinate が生成できる
        // given (前提条件):
        let (lat, lng) = (12.9, 77.6);

        // when (操作):
        let coordinate = Coordinate::new(lat, lng).unwrap();

        // then (期待する結果):
        assert_eq!(coordinate.lat(), 12.9);
        assert_eq!(coordinate.lng(), 77.6);
    }

    #[test]
    fn test_coordinate_rejects_nan_latitude() {
        // テスト項目: NaN の緯度から Coordinate は生成できない
        // given (前提条件):
        let (lat, lng) = (f64::NAN, 77.6);

        // when (操作):
        let result = Coordinate::new(lat, lng);

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(DomainError::NonFiniteCoordinate { field: "lat", .. })
        ));
    }

    #[test]
    fn test_coordinate_rejects_infinite_longitude() {
        // テスト項目: 無限大の経度から Coordinate は生成できない
        // given (前提条件):
        let (lat, lng) = (12.9, f64::INFINITY);

        // when (操作):
        let result = Coordinate::new(lat, lng);

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(DomainError::NonFiniteCoordinate { field: "lng", .. })
        ));
    }
}
