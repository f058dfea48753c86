//! Session roll-up recomputation.
//!
//! After every message mutation the session's `message_count`, `token_count`
//! and `total_cost` are recomputed from scratch over its live messages. A
//! failed recompute never undoes the mutation that triggered it: the roll-up
//! stays stale until the next mutation of the same session recomputes it.

use chrono::Utc;
use parley_types::chat::SessionAggregate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chat::repository::AggregateStore;

/// Result of a recompute attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum AggregateOutcome {
    /// The roll-up was recomputed and persisted.
    Fresh(SessionAggregate),
    /// The roll-up could not be refreshed and may lag behind the messages.
    Stale { reason: String },
}

impl AggregateOutcome {
    pub fn is_fresh(&self) -> bool {
        matches!(self, AggregateOutcome::Fresh(_))
    }

    pub fn aggregate(&self) -> Option<&SessionAggregate> {
        match self {
            AggregateOutcome::Fresh(aggregate) => Some(aggregate),
            AggregateOutcome::Stale { .. } => None,
        }
    }
}

/// A committed mutation together with the recompute that followed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recomputed<T> {
    pub value: T,
    pub aggregate: AggregateOutcome,
}

impl<T> Recomputed<T> {
    /// Soft warning for the caller when the roll-up could not be refreshed.
    pub fn warning(&self) -> Option<&str> {
        match &self.aggregate {
            AggregateOutcome::Fresh(_) => None,
            AggregateOutcome::Stale { reason } => Some(reason),
        }
    }
}

/// Recomputes session roll-ups through an [`AggregateStore`].
pub struct AggregateRecalculator<'a, S: AggregateStore> {
    store: &'a S,
}

impl<'a, S: AggregateStore> AggregateRecalculator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Recompute and persist the roll-up of `session_id`.
    ///
    /// Never fails: store errors are logged and reported as
    /// [`AggregateOutcome::Stale`].
    pub async fn recompute(&self, session_id: &Uuid) -> AggregateOutcome {
        match self.store.recompute_aggregate(session_id, Utc::now()).await {
            Ok(Some(aggregate)) => {
                debug!(
                    session_id = %session_id,
                    message_count = aggregate.message_count,
                    token_count = aggregate.token_count,
                    total_cost = aggregate.total_cost,
                    "Session aggregate recomputed"
                );
                AggregateOutcome::Fresh(aggregate)
            }
            Ok(None) => {
                warn!(session_id = %session_id, "Aggregate recompute skipped: session missing or deleted");
                AggregateOutcome::Stale {
                    reason: format!("session {session_id} is missing or deleted"),
                }
            }
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    error = %e,
                    "Aggregate recompute failed; roll-up stays stale until the next mutation"
                );
                AggregateOutcome::Stale {
                    reason: format!("aggregate recompute failed: {e}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use parley_types::error::RepositoryError;

    enum Behaviour {
        Succeed,
        Missing,
        Fail,
    }

    struct StubStore(Behaviour);

    impl AggregateStore for StubStore {
        async fn recompute_aggregate(
            &self,
            session_id: &Uuid,
            now: DateTime<Utc>,
        ) -> Result<Option<SessionAggregate>, RepositoryError> {
            match self.0 {
                Behaviour::Succeed => Ok(Some(SessionAggregate {
                    session_id: *session_id,
                    message_count: 2,
                    token_count: 30,
                    total_cost: 0.03,
                    last_message_at: now,
                })),
                Behaviour::Missing => Ok(None),
                Behaviour::Fail => Err(RepositoryError::Connection("database is locked".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_recompute_fresh() {
        let store = StubStore(Behaviour::Succeed);
        let id = Uuid::now_v7();
        let outcome = AggregateRecalculator::new(&store).recompute(&id).await;
        assert!(outcome.is_fresh());
        let aggregate = outcome.aggregate().unwrap();
        assert_eq!(aggregate.session_id, id);
        assert_eq!(aggregate.message_count, 2);
    }

    #[tokio::test]
    async fn test_recompute_failure_is_soft() {
        let store = StubStore(Behaviour::Fail);
        let outcome = AggregateRecalculator::new(&store)
            .recompute(&Uuid::now_v7())
            .await;
        match &outcome {
            AggregateOutcome::Stale { reason } => assert!(reason.contains("database is locked")),
            other => panic!("expected stale outcome, got {other:?}"),
        }

        let wrapped = Recomputed {
            value: 1,
            aggregate: outcome,
        };
        assert!(wrapped.warning().is_some());
    }

    #[tokio::test]
    async fn test_recompute_missing_session_is_stale() {
        let store = StubStore(Behaviour::Missing);
        let outcome = AggregateRecalculator::new(&store)
            .recompute(&Uuid::now_v7())
            .await;
        assert!(!outcome.is_fresh());
        assert!(outcome.aggregate().is_none());
    }

    #[test]
    fn test_outcome_serializes_with_state_tag() {
        let outcome = AggregateOutcome::Stale {
            reason: "x".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["state"], "stale");
    }
}
