//! SubscriptionRepository trait definition.

use chrono::{DateTime, Utc};
use parley_types::error::RepositoryError;
use parley_types::page::PageRequest;
use parley_types::subscription::{
    Article, LinkStatus, NewArticle, NewSubscription, Subscription, SubscriptionLink,
    SubscriptionView,
};
use parley_types::user::UserId;

/// Repository trait for subscriptions, membership links, and articles.
///
/// Unique-constraint rejections surface as `RepositoryError::Conflict`; the
/// reconciler relies on that to detect a lost race.
pub trait SubscriptionRepository: Send + Sync {
    /// The active subscription for a topic, if any.
    fn find_active_by_topic(
        &self,
        topic_name: &str,
    ) -> impl std::future::Future<Output = Result<Option<Subscription>, RepositoryError>> + Send;

    /// A subscription by id regardless of status.
    fn get_subscription(
        &self,
        subscription_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Subscription>, RepositoryError>> + Send;

    /// The link row for (user, subscription) regardless of status.
    fn find_link(
        &self,
        user_id: UserId,
        subscription_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<SubscriptionLink>, RepositoryError>> + Send;

    /// Create a subscription and the creator's active link in one transaction.
    ///
    /// `Conflict` if another active subscription for the topic committed first.
    fn create_subscription_with_link(
        &self,
        input: &NewSubscription,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(Subscription, SubscriptionLink), RepositoryError>> + Send;

    /// Insert an active link. `Conflict` if the pair already has a row.
    fn insert_link(
        &self,
        user_id: UserId,
        subscription_id: i64,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<SubscriptionLink, RepositoryError>> + Send;

    /// Compare-and-set a link's status.
    ///
    /// Returns `false` when the row was not in status `from`.
    fn transition_link(
        &self,
        link_id: i64,
        from: LinkStatus,
        to: LinkStatus,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Replace the description of an active subscription. `NotFound` if none matched.
    fn update_description(
        &self,
        subscription_id: i64,
        description: &str,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Soft-delete a subscription. Returns `false` if it was already cancelled.
    ///
    /// Link rows are left untouched.
    fn cancel_subscription(
        &self,
        subscription_id: i64,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Effective memberships of a user (active link and active subscription),
    /// most recently joined first.
    fn list_user_subscriptions(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<(Vec<SubscriptionView>, u64), RepositoryError>> + Send;

    /// Live articles of a subscription, newest publication first.
    fn list_articles(
        &self,
        subscription_id: i64,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<(Vec<Article>, u64), RepositoryError>> + Send;

    /// Live articles across a user's effective memberships.
    fn list_user_articles(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<(Vec<Article>, u64), RepositoryError>> + Send;

    fn insert_article(
        &self,
        subscription_id: i64,
        article: &NewArticle,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Article, RepositoryError>> + Send;

    /// Soft-delete a live article. Returns `false` if no live article matched.
    fn soft_delete_article(
        &self,
        article_id: i64,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
