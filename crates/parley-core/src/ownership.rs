//! Existence and ownership checks shared by the services.
//!
//! Both run before any write so a rejected call never mutates anything.

use parley_types::chat::ChatSession;
use parley_types::error::ServiceError;
use parley_types::subscription::Subscription;
use parley_types::user::UserId;

/// A record with a single owning user.
pub trait Owned {
    fn owner(&self) -> UserId;

    /// Short description used in error messages, e.g. `session 0190...`.
    fn describe(&self) -> String;
}

impl Owned for ChatSession {
    fn owner(&self) -> UserId {
        self.user_id
    }

    fn describe(&self) -> String {
        format!("session {}", self.id)
    }
}

/// Subscriptions are owned by the user whose subscribe call created them.
impl Owned for Subscription {
    fn owner(&self) -> UserId {
        self.creator_id
    }

    fn describe(&self) -> String {
        format!("subscription {}", self.id)
    }
}

/// Fail with `PermissionDenied` unless `user` owns `record`.
pub fn ensure_owner<T: Owned>(record: &T, user: UserId) -> Result<(), ServiceError> {
    if record.owner() == user {
        Ok(())
    } else {
        Err(ServiceError::PermissionDenied(format!(
            "user {user} does not own {}",
            record.describe()
        )))
    }
}

/// Turn a missing lookup into `NotFound`.
pub fn found<T>(record: Option<T>, what: impl FnOnce() -> String) -> Result<T, ServiceError> {
    record.ok_or_else(|| ServiceError::NotFound(what()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parley_types::chat::SessionStatus;
    use parley_types::subscription::SubscriptionStatus;
    use uuid::Uuid;

    fn session_of(user: i64) -> ChatSession {
        let now = Utc::now();
        ChatSession {
            id: Uuid::now_v7(),
            user_id: UserId(user),
            topic: "rust".to_string(),
            model: "gpt-4o".to_string(),
            channel_id: 1,
            message_count: 0,
            token_count: 0,
            total_cost: 0.0,
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
            last_message_at: None,
        }
    }

    #[test]
    fn test_owner_passes() {
        assert!(ensure_owner(&session_of(1), UserId(1)).is_ok());
    }

    #[test]
    fn test_non_owner_denied() {
        let session = session_of(1);
        let err = ensure_owner(&session, UserId(2)).unwrap_err();
        match err {
            ServiceError::PermissionDenied(msg) => {
                assert!(msg.contains("user 2"));
                assert!(msg.contains(&session.id.to_string()));
            }
            other => panic!("expected PermissionDenied, got {other:?}"),
        }
    }

    #[test]
    fn test_subscription_owned_by_creator() {
        let now = Utc::now();
        let subscription = Subscription {
            id: 7,
            creator_id: UserId(1),
            topic_name: "ml".to_string(),
            description: String::new(),
            status: SubscriptionStatus::Active,
            created_at: now,
            updated_at: now,
        };
        assert!(ensure_owner(&subscription, UserId(1)).is_ok());
        let err = ensure_owner(&subscription, UserId(2)).unwrap_err();
        assert_eq!(err.to_string(), "permission denied: user 2 does not own subscription 7");
    }

    #[test]
    fn test_found() {
        assert_eq!(found(Some(3), || "x".to_string()).unwrap(), 3);
        let err = found::<u8>(None, || "session abc".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "not found: session abc");
    }
}
