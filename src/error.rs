//! Unified error handling for the map-query library.
//!
//! Store failures are fatal for the single request that triggered them:
//! internal fetch paths propagate them with `?`, and the public getters
//! degrade to an empty result so that a map draws nothing instead of
//! tearing down interaction.

use std::fmt;

/// Unified error type for map-query operations.
#[derive(Debug, Clone)]
pub enum MapQueryError {
    /// Preparing or executing a store query failed
    Database { message: String },
    /// A query result row could not be decoded into an entity
    RowDecode { entity: &'static str, message: String },
}

impl fmt::Display for MapQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapQueryError::Database { message } => {
                write!(f, "Database error: {}", message)
            }
            MapQueryError::RowDecode { entity, message } => {
                write!(f, "Failed to decode {} row: {}", entity, message)
            }
        }
    }
}

impl std::error::Error for MapQueryError {}

impl From<rusqlite::Error> for MapQueryError {
    fn from(err: rusqlite::Error) -> Self {
        MapQueryError::Database {
            message: err.to_string(),
        }
    }
}

/// Result type alias for map-query operations.
pub type Result<T> = std::result::Result<T, MapQueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MapQueryError::RowDecode {
            entity: "airport",
            message: "missing column ident".to_string(),
        };
        assert!(err.to_string().contains("airport"));
        assert!(err.to_string().contains("ident"));
    }

    #[test]
    fn test_from_rusqlite() {
        let err: MapQueryError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, MapQueryError::Database { .. }));
    }
}
