use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Identifier of an authenticated user.
///
/// Users are managed by the calling layer; the core only ever receives an
/// already-authenticated id and compares it against record owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_parse_and_display() {
        let id: UserId = " 42 ".parse().unwrap();
        assert_eq!(id, UserId(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn test_user_id_serializes_as_number() {
        let json = serde_json::to_string(&UserId(7)).unwrap();
        assert_eq!(json, "7");
    }
}
