//! Soft-delete marker shared by message and article rows.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Whether a row is visible to reads or has been soft-deleted.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (state IN ('live', 'deleted'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    #[default]
    Live,
    Deleted,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordState::Live => write!(f, "live"),
            RecordState::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for RecordState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" => Ok(RecordState::Live),
            "deleted" => Ok(RecordState::Deleted),
            other => Err(format!("invalid record state: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_state_roundtrip() {
        for state in [RecordState::Live, RecordState::Deleted] {
            let parsed: RecordState = state.to_string().parse().unwrap();
            assert_eq!(state, parsed);
        }
        assert!("gone".parse::<RecordState>().is_err());
    }
}
