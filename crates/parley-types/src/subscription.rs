//! Subscription, membership link, and article types for Parley.
//!
//! A `Subscription` is one shared record per topic. Users join it through a
//! `SubscriptionLink` row whose status is independent of the subscription's
//! own status. A user's effective membership requires both to be active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::user::UserId;

pub const MAX_TOPIC_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

pub const MAX_ARTICLE_TITLE_CHARS: usize = 255;
pub const MAX_ARTICLE_SUMMARY_CHARS: usize = 1000;
pub const MAX_ARTICLE_CONTENT_CHARS: usize = 10_000;
pub const MAX_ARTICLE_AUTHOR_CHARS: usize = 100;
pub const MAX_ARTICLE_URL_CHARS: usize = 500;
pub const MAX_ARTICLE_KEY_POINTS_CHARS: usize = 2000;
pub const MAX_ARTICLE_JOURNAL_CHARS: usize = 200;
pub const MAX_ARTICLE_RATING: f64 = 10.0;

/// Status of a subscription record. `Cancelled` is its soft-deleted state.
///
/// Maps to `CHECK (status IN ('active', 'cancelled'))` on `subscriptions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Cancelled,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SubscriptionStatus::Active),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(format!("invalid subscription status: '{other}'")),
        }
    }
}

/// Status of a user's membership link.
///
/// Maps to `CHECK (status IN ('active', 'cancelled'))` on `user_subscriptions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    #[default]
    Active,
    Cancelled,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Active => write!(f, "active"),
            LinkStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for LinkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(LinkStatus::Active),
            "cancelled" => Ok(LinkStatus::Cancelled),
            other => Err(format!("invalid link status: '{other}'")),
        }
    }
}

/// A topic that users can subscribe to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    /// User whose subscribe call created the record; the only one allowed to edit it.
    pub creator_id: UserId,
    pub topic_name: String,
    pub description: String,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The single membership row for a (user, subscription) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionLink {
    pub id: i64,
    pub user_id: UserId,
    pub subscription_id: i64,
    pub status: LinkStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for the subscription record created on the first subscribe to a topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscription {
    pub creator_id: UserId,
    pub topic_name: String,
    pub description: String,
}

/// One entry of a user's effective subscription list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionView {
    pub subscription: Subscription,
    pub link: SubscriptionLink,
    /// Live articles, counted at read time.
    pub article_count: u64,
}

/// How a subscribe call reached the active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
    /// A new subscription record and link were created.
    Created,
    /// A new link was added to an existing subscription.
    Joined,
    /// The link was already active; nothing changed.
    AlreadyActive,
    /// A cancelled link was flipped back to active.
    Reactivated,
}

impl fmt::Display for SubscribeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscribeOutcome::Created => write!(f, "created"),
            SubscribeOutcome::Joined => write!(f, "joined"),
            SubscribeOutcome::AlreadyActive => write!(f, "already_active"),
            SubscribeOutcome::Reactivated => write!(f, "reactivated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeResult {
    pub subscription_id: i64,
    pub outcome: SubscribeOutcome,
}

/// Result of a cancel or reactivate call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipChange {
    pub subscription_id: i64,
    pub previous: LinkStatus,
    pub current: LinkStatus,
}

impl MembershipChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// An article published under a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub subscription_id: i64,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub author: String,
    pub published_at: Option<DateTime<Utc>>,
    pub url: String,
    pub key_points: String,
    pub journal_name: String,
    pub read_count: u32,
    pub citation_count: u32,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for publishing an article.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub key_points: String,
    #[serde(default)]
    pub journal_name: String,
    #[serde(default)]
    pub citation_count: u32,
    #[serde(default)]
    pub rating: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrips() {
        for status in [SubscriptionStatus::Active, SubscriptionStatus::Cancelled] {
            let parsed: SubscriptionStatus = status.to_string().parse().unwrap();
            assert_eq!(status, parsed);
        }
        for status in [LinkStatus::Active, LinkStatus::Cancelled] {
            let parsed: LinkStatus = status.to_string().parse().unwrap();
            assert_eq!(status, parsed);
        }
        assert!("paused".parse::<LinkStatus>().is_err());
    }

    #[test]
    fn test_subscribe_outcome_serde() {
        let json = serde_json::to_string(&SubscribeOutcome::AlreadyActive).unwrap();
        assert_eq!(json, "\"already_active\"");
        assert_eq!(SubscribeOutcome::AlreadyActive.to_string(), "already_active");
    }

    #[test]
    fn test_membership_change_changed() {
        let change = MembershipChange {
            subscription_id: 1,
            previous: LinkStatus::Active,
            current: LinkStatus::Cancelled,
        };
        assert!(change.changed());

        let noop = MembershipChange {
            subscription_id: 1,
            previous: LinkStatus::Cancelled,
            current: LinkStatus::Cancelled,
        };
        assert!(!noop.changed());
    }

    #[test]
    fn test_new_article_minimal_json() {
        let article: NewArticle = serde_json::from_str(r#"{"title":"Attention","published_at":null}"#).unwrap();
        assert_eq!(article.title, "Attention");
        assert!(article.summary.is_empty());
        assert_eq!(article.citation_count, 0);
    }
}
