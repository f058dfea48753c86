//! Subscription reconciler.
//!
//! Drives the membership state machine against the store. `subscribe` is a
//! check-then-act sequence, so two first-time subscribers to a new topic can
//! both see "no subscription" and both try to create it. The store's unique
//! constraints reject the loser, who then retries from a fresh lookup and
//! joins the winner's subscription. The same retry covers a link that
//! changed between read and compare-and-set in `cancel` and `reactivate`.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use parley_types::config::ParleyConfig;
use parley_types::error::ServiceError;
use parley_types::page::Page;
use parley_types::subscription::{
    Article, LinkStatus, MAX_ARTICLE_AUTHOR_CHARS, MAX_ARTICLE_CONTENT_CHARS,
    MAX_ARTICLE_JOURNAL_CHARS, MAX_ARTICLE_KEY_POINTS_CHARS, MAX_ARTICLE_RATING,
    MAX_ARTICLE_SUMMARY_CHARS, MAX_ARTICLE_TITLE_CHARS, MAX_ARTICLE_URL_CHARS,
    MAX_DESCRIPTION_CHARS, MAX_TOPIC_NAME_CHARS, MembershipChange, NewArticle, NewSubscription,
    SubscribeOutcome, SubscribeResult, Subscription, SubscriptionLink, SubscriptionStatus,
    SubscriptionView,
};
use parley_types::user::UserId;
use tracing::{info, warn};

use crate::ownership::{ensure_owner, found};
use crate::subscription::repository::SubscriptionRepository;
use crate::subscription::state::{MembershipState, Step, Transition};
use crate::validate;

/// Owns subscribe/cancel/reactivate transitions and subscription reads.
pub struct SubscriptionReconciler<S: SubscriptionRepository> {
    repo: S,
    config: Arc<ParleyConfig>,
}

impl<S: SubscriptionRepository> SubscriptionReconciler<S> {
    pub fn new(repo: S, config: Arc<ParleyConfig>) -> Self {
        Self { repo, config }
    }

    /// Access the subscription repository.
    pub fn repo(&self) -> &S {
        &self.repo
    }

    // --- Membership transitions ---

    /// Subscribe `user` to `topic_name`, creating the subscription on first use.
    ///
    /// Idempotent: an already-active membership is returned unchanged, and a
    /// cancelled one is reactivated in place.
    pub async fn subscribe(
        &self,
        user: UserId,
        topic_name: &str,
        description: &str,
    ) -> Result<SubscribeResult, ServiceError> {
        let topic = validate::required_text("topic_name", topic_name, MAX_TOPIC_NAME_CHARS)?;
        let description = description.trim();
        validate::bounded_text("description", description, MAX_DESCRIPTION_CHARS)?;

        let topic = topic.as_str();
        self.retry_lost_races("subscribe", move || {
            self.try_subscribe(user, topic, description)
        })
        .await
    }

    /// Cancel `user`'s membership. Idempotent; the link row is kept.
    pub async fn cancel(
        &self,
        user: UserId,
        subscription_id: i64,
    ) -> Result<MembershipChange, ServiceError> {
        self.retry_lost_races("cancel", move || {
            self.try_transition(user, subscription_id, Transition::Cancel)
        })
        .await
    }

    /// Reactivate a cancelled membership in place. Idempotent.
    pub async fn reactivate(
        &self,
        user: UserId,
        subscription_id: i64,
    ) -> Result<MembershipChange, ServiceError> {
        self.retry_lost_races("reactivate", move || {
            self.try_transition(user, subscription_id, Transition::Reactivate)
        })
        .await
    }

    // --- Subscription records ---

    /// Replace a subscription's description. Only its creator may do this.
    pub async fn update_description(
        &self,
        user: UserId,
        subscription_id: i64,
        description: &str,
    ) -> Result<Subscription, ServiceError> {
        let description = description.trim();
        validate::bounded_text("description", description, MAX_DESCRIPTION_CHARS)?;

        let mut subscription = self.active_subscription(subscription_id).await?;
        ensure_owner(&subscription, user)?;

        let now = Utc::now();
        self.repo
            .update_description(subscription_id, description, now)
            .await?;
        subscription.description = description.to_string();
        subscription.updated_at = now;

        info!(subscription_id, user_id = %user, "Subscription description updated");
        Ok(subscription)
    }

    /// Soft-delete a subscription (administrative).
    ///
    /// Link rows are kept; effective-membership reads exclude them because
    /// they join on the subscription's status.
    pub async fn delete(&self, subscription_id: i64) -> Result<Subscription, ServiceError> {
        let mut subscription = found(self.repo.get_subscription(subscription_id).await?, || {
            format!("subscription {subscription_id}")
        })?;

        let now = Utc::now();
        if self.repo.cancel_subscription(subscription_id, now).await? {
            info!(subscription_id, "Subscription deleted");
            subscription.updated_at = now;
        }
        subscription.status = SubscriptionStatus::Cancelled;
        Ok(subscription)
    }

    // --- Reads ---

    /// Effective memberships of `user`.
    pub async fn list_for_user(
        &self,
        user: UserId,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<SubscriptionView>, ServiceError> {
        let request = self.config.pagination.subscriptions(page, page_size);
        let (items, total) = self.repo.list_user_subscriptions(user, request).await?;
        Ok(Page::new(items, total, request))
    }

    /// Articles of one subscription; requires an effective membership.
    pub async fn list_articles(
        &self,
        user: UserId,
        subscription_id: i64,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<Article>, ServiceError> {
        self.active_subscription(subscription_id).await?;
        let link = self.repo.find_link(user, subscription_id).await?;
        if MembershipState::of(link.as_ref()) != MembershipState::Active {
            return Err(ServiceError::PermissionDenied(format!(
                "user {user} is not subscribed to subscription {subscription_id}"
            )));
        }

        let request = self.config.pagination.articles(page, page_size);
        let (items, total) = self.repo.list_articles(subscription_id, request).await?;
        Ok(Page::new(items, total, request))
    }

    /// Articles across all effective memberships of `user`.
    pub async fn list_all_articles_for_user(
        &self,
        user: UserId,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<Article>, ServiceError> {
        let request = self.config.pagination.articles(page, page_size);
        let (items, total) = self.repo.list_user_articles(user, request).await?;
        Ok(Page::new(items, total, request))
    }

    // --- Articles (administrative) ---

    pub async fn create_article(
        &self,
        subscription_id: i64,
        article: NewArticle,
    ) -> Result<Article, ServiceError> {
        let article = validate_article(article)?;
        self.active_subscription(subscription_id).await?;

        let created = self
            .repo
            .insert_article(subscription_id, &article, Utc::now())
            .await?;

        info!(subscription_id, article_id = created.id, "Article created");
        Ok(created)
    }

    pub async fn delete_article(&self, article_id: i64) -> Result<(), ServiceError> {
        if !self.repo.soft_delete_article(article_id, Utc::now()).await? {
            return Err(ServiceError::NotFound(format!("article {article_id}")));
        }
        info!(article_id, "Article deleted");
        Ok(())
    }

    // --- Helpers ---

    /// Run `attempt` until it stops losing races, up to the configured budget.
    async fn retry_lost_races<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let max_attempts = self.config.subscriptions.max_subscribe_attempts.max(1);
        let mut tries = 1;
        loop {
            match attempt().await {
                Err(ServiceError::Conflict(reason)) if tries < max_attempts => {
                    warn!(
                        operation,
                        attempt = tries,
                        %reason,
                        "Lost a concurrent write, retrying from a fresh read"
                    );
                    tries += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_subscribe(
        &self,
        user: UserId,
        topic: &str,
        description: &str,
    ) -> Result<SubscribeResult, ServiceError> {
        let Some(subscription) = self.repo.find_active_by_topic(topic).await? else {
            let input = NewSubscription {
                creator_id: user,
                topic_name: topic.to_string(),
                description: description.to_string(),
            };
            let (subscription, _link) = self
                .repo
                .create_subscription_with_link(&input, Utc::now())
                .await?;
            info!(subscription_id = subscription.id, user_id = %user, topic, "Subscription created");
            return Ok(SubscribeResult {
                subscription_id: subscription.id,
                outcome: SubscribeOutcome::Created,
            });
        };

        let link = self.repo.find_link(user, subscription.id).await?;
        let step = MembershipState::of(link.as_ref())
            .step(Transition::Subscribe)
            .map_err(|e| ServiceError::Conflict(e.to_string()))?;
        self.apply_step(user, subscription.id, link.as_ref(), step)
            .await?;

        let outcome = match step {
            Step::InsertLink => SubscribeOutcome::Joined,
            Step::Activate => SubscribeOutcome::Reactivated,
            Step::Deactivate | Step::Noop => SubscribeOutcome::AlreadyActive,
        };
        if outcome != SubscribeOutcome::AlreadyActive {
            info!(subscription_id = subscription.id, user_id = %user, %outcome, "Subscribed");
        }
        Ok(SubscribeResult {
            subscription_id: subscription.id,
            outcome,
        })
    }

    async fn try_transition(
        &self,
        user: UserId,
        subscription_id: i64,
        transition: Transition,
    ) -> Result<MembershipChange, ServiceError> {
        let subscription = found(self.repo.get_subscription(subscription_id).await?, || {
            format!("subscription {subscription_id}")
        })?;
        if transition == Transition::Reactivate && subscription.status != SubscriptionStatus::Active {
            return Err(ServiceError::NotFound(format!(
                "subscription {subscription_id} has been deleted"
            )));
        }

        let link = self.repo.find_link(user, subscription_id).await?;
        let step = MembershipState::of(link.as_ref())
            .step(transition)
            .map_err(|e| {
                ServiceError::PermissionDenied(format!(
                    "user {user} on subscription {subscription_id}: {e}"
                ))
            })?;
        let Some(link) = link else {
            return Err(ServiceError::PermissionDenied(format!(
                "user {user} is not subscribed to subscription {subscription_id}"
            )));
        };

        let current = self
            .apply_step(user, subscription_id, Some(&link), step)
            .await?;
        let change = MembershipChange {
            subscription_id,
            previous: link.status,
            current,
        };
        if change.changed() {
            info!(subscription_id, user_id = %user, %transition, status = %current, "Membership changed");
        }
        Ok(change)
    }

    /// Perform the store write for `step` and return the resulting link status.
    ///
    /// A unique violation on insert or a failed compare-and-set becomes
    /// `Conflict`, which `retry_lost_races` turns into a fresh attempt.
    async fn apply_step(
        &self,
        user: UserId,
        subscription_id: i64,
        link: Option<&SubscriptionLink>,
        step: Step,
    ) -> Result<LinkStatus, ServiceError> {
        let now = Utc::now();
        match (step, step.link_change(), link) {
            (Step::InsertLink, _, _) => {
                self.repo.insert_link(user, subscription_id, now).await?;
                Ok(LinkStatus::Active)
            }
            (_, Some((from, to)), Some(link)) => {
                if self.repo.transition_link(link.id, from, to, now).await? {
                    Ok(to)
                } else {
                    Err(ServiceError::Conflict(format!(
                        "link {} changed concurrently",
                        link.id
                    )))
                }
            }
            (_, Some(_), None) => Err(ServiceError::Conflict(format!(
                "link for subscription {subscription_id} disappeared"
            ))),
            (_, None, link) => Ok(link.map(|l| l.status).unwrap_or(LinkStatus::Active)),
        }
    }

    async fn active_subscription(&self, subscription_id: i64) -> Result<Subscription, ServiceError> {
        let subscription = found(self.repo.get_subscription(subscription_id).await?, || {
            format!("subscription {subscription_id}")
        })?;
        if subscription.status != SubscriptionStatus::Active {
            return Err(ServiceError::NotFound(format!(
                "subscription {subscription_id} has been deleted"
            )));
        }
        Ok(subscription)
    }
}

fn validate_article(mut article: NewArticle) -> Result<NewArticle, ServiceError> {
    article.title = validate::required_text("title", &article.title, MAX_ARTICLE_TITLE_CHARS)?;
    validate::bounded_text("summary", &article.summary, MAX_ARTICLE_SUMMARY_CHARS)?;
    validate::bounded_text("content", &article.content, MAX_ARTICLE_CONTENT_CHARS)?;
    validate::bounded_text("author", &article.author, MAX_ARTICLE_AUTHOR_CHARS)?;
    validate::bounded_text("url", &article.url, MAX_ARTICLE_URL_CHARS)?;
    validate::bounded_text("key_points", &article.key_points, MAX_ARTICLE_KEY_POINTS_CHARS)?;
    validate::bounded_text("journal_name", &article.journal_name, MAX_ARTICLE_JOURNAL_CHARS)?;
    validate::in_range("rating", article.rating, 0.0, MAX_ARTICLE_RATING)?;
    Ok(article)
}
