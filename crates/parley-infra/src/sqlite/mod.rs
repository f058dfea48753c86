//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod chat;
pub mod pool;
pub mod scope;
pub mod subscription;

use chrono::{DateTime, SecondsFormat, Utc};
use parley_types::error::RepositoryError;

/// Classify a sqlx error for the repository layer.
///
/// Unique violations become `Conflict`; pool exhaustion, IO and lock
/// contention become `Connection`; everything else is a `Query` failure.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            if message.contains("UNIQUE") {
                RepositoryError::Conflict(message.to_string())
            } else if message.contains("database is locked") || message.contains("busy") {
                RepositoryError::Connection(message.to_string())
            } else {
                RepositoryError::Query(message.to_string())
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection(err.to_string())
        }
        other => RepositoryError::Query(other.to_string()),
    }
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 so that text order equals time order.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_datetime_sorts_lexicographically() {
        let early = DateTime::parse_from_rfc3339("2026-01-01T00:00:00.5Z")
            .unwrap()
            .with_timezone(&Utc);
        let late = DateTime::parse_from_rfc3339("2026-01-01T00:00:01Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_datetime(&early), "2026-01-01T00:00:00.500000Z");
        assert!(format_datetime(&early) < format_datetime(&late));
        assert_eq!(parse_datetime(&format_datetime(&late)).unwrap(), late);
    }

    #[test]
    fn test_map_non_database_errors() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepositoryError::Connection(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepositoryError::Query(_)
        ));
    }
}
