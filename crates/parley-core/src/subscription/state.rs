//! Membership state machine for one (user, subscription) pair.
//!
//! ```text
//! [no link] --subscribe--> [active] --cancel--> [cancelled] --reactivate/subscribe--> [active]
//! ```
//!
//! `MembershipState::step` maps a requested transition to the single store
//! write it needs. It never returns a step that would insert a second link
//! row for a pair that already has one.

use parley_types::subscription::{LinkStatus, SubscriptionLink};
use thiserror::Error;

/// Where a user stands with respect to one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipState {
    NoLink,
    Active,
    Cancelled,
}

impl MembershipState {
    /// State derived from the link row, if any.
    pub fn of(link: Option<&SubscriptionLink>) -> Self {
        match link.map(|l| l.status) {
            None => MembershipState::NoLink,
            Some(LinkStatus::Active) => MembershipState::Active,
            Some(LinkStatus::Cancelled) => MembershipState::Cancelled,
        }
    }

    /// The store write needed to apply `transition` from this state.
    pub fn step(self, transition: Transition) -> Result<Step, TransitionError> {
        use MembershipState as S;
        use Transition as T;

        match (self, transition) {
            (S::NoLink, T::Subscribe) => Ok(Step::InsertLink),
            (S::NoLink, T::Cancel | T::Reactivate) => Err(TransitionError::NoMembership(transition)),
            (S::Active, T::Subscribe | T::Reactivate) => Ok(Step::Noop),
            (S::Active, T::Cancel) => Ok(Step::Deactivate),
            (S::Cancelled, T::Subscribe | T::Reactivate) => Ok(Step::Activate),
            (S::Cancelled, T::Cancel) => Ok(Step::Noop),
        }
    }
}

/// A named request against a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Subscribe,
    Cancel,
    Reactivate,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Subscribe => write!(f, "subscribe"),
            Transition::Cancel => write!(f, "cancel"),
            Transition::Reactivate => write!(f, "reactivate"),
        }
    }
}

/// The store write a transition resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Insert the pair's first and only link row, active.
    InsertLink,
    /// Flip the existing link from cancelled to active.
    Activate,
    /// Flip the existing link from active to cancelled.
    Deactivate,
    Noop,
}

impl Step {
    /// `(from, to)` for steps that update an existing link in place.
    pub fn link_change(self) -> Option<(LinkStatus, LinkStatus)> {
        match self {
            Step::Activate => Some((LinkStatus::Cancelled, LinkStatus::Active)),
            Step::Deactivate => Some((LinkStatus::Active, LinkStatus::Cancelled)),
            Step::InsertLink | Step::Noop => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {0} without an existing membership")]
    NoMembership(Transition),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parley_types::user::UserId;

    fn link(status: LinkStatus) -> SubscriptionLink {
        SubscriptionLink {
            id: 1,
            user_id: UserId(1),
            subscription_id: 1,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_state_of_link() {
        assert_eq!(MembershipState::of(None), MembershipState::NoLink);
        assert_eq!(
            MembershipState::of(Some(&link(LinkStatus::Active))),
            MembershipState::Active
        );
        assert_eq!(
            MembershipState::of(Some(&link(LinkStatus::Cancelled))),
            MembershipState::Cancelled
        );
    }

    #[test]
    fn test_transition_table() {
        use MembershipState::*;
        use Transition::*;

        let cases = [
            (NoLink, Subscribe, Ok(Step::InsertLink)),
            (NoLink, Cancel, Err(TransitionError::NoMembership(Cancel))),
            (NoLink, Reactivate, Err(TransitionError::NoMembership(Reactivate))),
            (Active, Subscribe, Ok(Step::Noop)),
            (Active, Cancel, Ok(Step::Deactivate)),
            (Active, Reactivate, Ok(Step::Noop)),
            (Cancelled, Subscribe, Ok(Step::Activate)),
            (Cancelled, Cancel, Ok(Step::Noop)),
            (Cancelled, Reactivate, Ok(Step::Activate)),
        ];

        for (state, transition, expected) in cases {
            assert_eq!(state.step(transition), expected, "{state:?} + {transition:?}");
        }
    }

    #[test]
    fn test_only_no_link_inserts() {
        for state in [MembershipState::Active, MembershipState::Cancelled] {
            for transition in [Transition::Subscribe, Transition::Cancel, Transition::Reactivate] {
                assert_ne!(state.step(transition), Ok(Step::InsertLink));
            }
        }
    }

    #[test]
    fn test_link_change() {
        assert_eq!(
            Step::Activate.link_change(),
            Some((LinkStatus::Cancelled, LinkStatus::Active))
        );
        assert_eq!(
            Step::Deactivate.link_change(),
            Some((LinkStatus::Active, LinkStatus::Cancelled))
        );
        assert_eq!(Step::Noop.link_change(), None);
    }

    #[test]
    fn test_transition_error_display() {
        let err = TransitionError::NoMembership(Transition::Cancel);
        assert_eq!(err.to_string(), "cannot cancel without an existing membership");
    }
}
