//! SQLite subscription repository implementation.
//!
//! Uniqueness lives in the schema: `UNIQUE(user_id, subscription_id)` on
//! `user_subscriptions` and a partial unique index on active topic names.
//! A writer that loses a race gets `RepositoryError::Conflict` back, which the
//! reconciler turns into a retry.

use chrono::{DateTime, Utc};
use parley_core::subscription::repository::SubscriptionRepository;
use parley_types::error::RepositoryError;
use parley_types::page::PageRequest;
use parley_types::record::RecordState;
use parley_types::subscription::{
    Article, LinkStatus, NewArticle, NewSubscription, Subscription, SubscriptionLink,
    SubscriptionStatus, SubscriptionView,
};
use parley_types::user::UserId;
use sqlx::{QueryBuilder, Row, Sqlite};

use super::pool::DatabasePool;
use super::scope::{self, ArticleScope};
use super::{format_datetime, map_sqlx_error, parse_datetime};

/// SQLite-backed implementation of `SubscriptionRepository`.
#[derive(Clone)]
pub struct SqliteSubscriptionRepository {
    pool: DatabasePool,
}

impl SqliteSubscriptionRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch_articles(
        &self,
        scope: ArticleScope,
        page: PageRequest,
    ) -> Result<(Vec<Article>, u64), RepositoryError> {
        let mut count_qb = scope::articles("COUNT(*)", &scope);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let mut qb: QueryBuilder<'static, Sqlite> = scope::articles("a.*", &scope);
        qb.push(" ORDER BY a.published_at DESC, a.created_at DESC, a.id DESC");
        scope::push_page(&mut qb, page);
        let rows = qb
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in &rows {
            articles.push(ArticleRow::from_row(row)?.into_article()?);
        }
        Ok((articles, total as u64))
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct SubscriptionRow {
    id: i64,
    creator_id: i64,
    topic_name: String,
    description: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl SubscriptionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, RepositoryError> {
        let read = || -> Result<Self, sqlx::Error> {
            Ok(Self {
                id: row.try_get("id")?,
                creator_id: row.try_get("creator_id")?,
                topic_name: row.try_get("topic_name")?,
                description: row.try_get("description")?,
                status: row.try_get("status")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        };
        read().map_err(|e| RepositoryError::Query(e.to_string()))
    }

    fn into_subscription(self) -> Result<Subscription, RepositoryError> {
        let status: SubscriptionStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Subscription {
            id: self.id,
            creator_id: UserId(self.creator_id),
            topic_name: self.topic_name,
            description: self.description,
            status,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

struct LinkRow {
    id: i64,
    user_id: i64,
    subscription_id: i64,
    status: String,
    created_at: String,
    updated_at: String,
}

impl LinkRow {
    /// Read a link whose columns carry `prefix` (empty for a plain
    /// `user_subscriptions` row, `link_` for the membership join).
    fn from_row(row: &sqlx::sqlite::SqliteRow, prefix: &str) -> Result<Self, RepositoryError> {
        let col = |name: &str| format!("{prefix}{name}");
        let read = || -> Result<Self, sqlx::Error> {
            Ok(Self {
                id: row.try_get(col("id").as_str())?,
                user_id: row.try_get(col("user_id").as_str())?,
                subscription_id: row.try_get(col("subscription_id").as_str())?,
                status: row.try_get(col("status").as_str())?,
                created_at: row.try_get(col("created_at").as_str())?,
                updated_at: row.try_get(col("updated_at").as_str())?,
            })
        };
        read().map_err(|e| RepositoryError::Query(e.to_string()))
    }

    fn into_link(self) -> Result<SubscriptionLink, RepositoryError> {
        let status: LinkStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(SubscriptionLink {
            id: self.id,
            user_id: UserId(self.user_id),
            subscription_id: self.subscription_id,
            status,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

struct ArticleRow {
    id: i64,
    subscription_id: i64,
    title: String,
    summary: String,
    content: String,
    author: String,
    published_at: Option<String>,
    url: String,
    key_points: String,
    journal_name: String,
    read_count: i64,
    citation_count: i64,
    rating: f64,
    created_at: String,
    updated_at: String,
}

impl ArticleRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, RepositoryError> {
        let read = || -> Result<Self, sqlx::Error> {
            Ok(Self {
                id: row.try_get("id")?,
                subscription_id: row.try_get("subscription_id")?,
                title: row.try_get("title")?,
                summary: row.try_get("summary")?,
                content: row.try_get("content")?,
                author: row.try_get("author")?,
                published_at: row.try_get("published_at")?,
                url: row.try_get("url")?,
                key_points: row.try_get("key_points")?,
                journal_name: row.try_get("journal_name")?,
                read_count: row.try_get("read_count")?,
                citation_count: row.try_get("citation_count")?,
                rating: row.try_get("rating")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        };
        read().map_err(|e| RepositoryError::Query(e.to_string()))
    }

    fn into_article(self) -> Result<Article, RepositoryError> {
        let published_at = self
            .published_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(Article {
            id: self.id,
            subscription_id: self.subscription_id,
            title: self.title,
            summary: self.summary,
            content: self.content,
            author: self.author,
            published_at,
            url: self.url,
            key_points: self.key_points,
            journal_name: self.journal_name,
            read_count: self.read_count as u32,
            citation_count: self.citation_count as u32,
            rating: self.rating,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// SubscriptionRepository implementation
// ---------------------------------------------------------------------------

impl SubscriptionRepository for SqliteSubscriptionRepository {
    async fn find_active_by_topic(
        &self,
        topic_name: &str,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM subscriptions WHERE topic_name = ? AND status = ?")
            .bind(topic_name)
            .bind(SubscriptionStatus::Active.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Some(SubscriptionRow::from_row(&row)?.into_subscription()?)),
            None => Ok(None),
        }
    }

    async fn get_subscription(
        &self,
        subscription_id: i64,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM subscriptions WHERE id = ?")
            .bind(subscription_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Some(SubscriptionRow::from_row(&row)?.into_subscription()?)),
            None => Ok(None),
        }
    }

    async fn find_link(
        &self,
        user_id: UserId,
        subscription_id: i64,
    ) -> Result<Option<SubscriptionLink>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM user_subscriptions WHERE user_id = ? AND subscription_id = ?",
        )
        .bind(user_id.0)
        .bind(subscription_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Some(LinkRow::from_row(&row, "")?.into_link()?)),
            None => Ok(None),
        }
    }

    async fn create_subscription_with_link(
        &self,
        input: &NewSubscription,
        now: DateTime<Utc>,
    ) -> Result<(Subscription, SubscriptionLink), RepositoryError> {
        let now_text = format_datetime(&now);
        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        let subscription_id = sqlx::query(
            r#"INSERT INTO subscriptions (creator_id, topic_name, description, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(input.creator_id.0)
        .bind(&input.topic_name)
        .bind(&input.description)
        .bind(SubscriptionStatus::Active.to_string())
        .bind(&now_text)
        .bind(&now_text)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .last_insert_rowid();

        let link_id = sqlx::query(
            r#"INSERT INTO user_subscriptions (user_id, subscription_id, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(input.creator_id.0)
        .bind(subscription_id)
        .bind(LinkStatus::Active.to_string())
        .bind(&now_text)
        .bind(&now_text)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .last_insert_rowid();

        tx.commit().await.map_err(map_sqlx_error)?;

        let subscription = Subscription {
            id: subscription_id,
            creator_id: input.creator_id,
            topic_name: input.topic_name.clone(),
            description: input.description.clone(),
            status: SubscriptionStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let link = SubscriptionLink {
            id: link_id,
            user_id: input.creator_id,
            subscription_id,
            status: LinkStatus::Active,
            created_at: now,
            updated_at: now,
        };
        Ok((subscription, link))
    }

    async fn insert_link(
        &self,
        user_id: UserId,
        subscription_id: i64,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionLink, RepositoryError> {
        let now_text = format_datetime(&now);
        let link_id = sqlx::query(
            r#"INSERT INTO user_subscriptions (user_id, subscription_id, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(user_id.0)
        .bind(subscription_id)
        .bind(LinkStatus::Active.to_string())
        .bind(&now_text)
        .bind(&now_text)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?
        .last_insert_rowid();

        Ok(SubscriptionLink {
            id: link_id,
            user_id,
            subscription_id,
            status: LinkStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    async fn transition_link(
        &self,
        link_id: i64,
        from: LinkStatus,
        to: LinkStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE user_subscriptions SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.to_string())
        .bind(format_datetime(&now))
        .bind(link_id)
        .bind(from.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_description(
        &self,
        subscription_id: i64,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET description = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(description)
        .bind(format_datetime(&now))
        .bind(subscription_id)
        .bind(SubscriptionStatus::Active.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn cancel_subscription(
        &self,
        subscription_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(SubscriptionStatus::Cancelled.to_string())
        .bind(format_datetime(&now))
        .bind(subscription_id)
        .bind(SubscriptionStatus::Active.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_user_subscriptions(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<(Vec<SubscriptionView>, u64), RepositoryError> {
        let mut count_qb = scope::memberships("COUNT(*)", user_id);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = scope::memberships(
            "sub.*, \
             l.id AS link_id, l.user_id AS link_user_id, l.subscription_id AS link_subscription_id, \
             l.status AS link_status, l.created_at AS link_created_at, l.updated_at AS link_updated_at, \
             COALESCE(ac.live_articles, 0) AS article_count",
            user_id,
        );
        qb.push(" ORDER BY l.updated_at DESC, l.id DESC");
        scope::push_page(&mut qb, page);
        let rows = qb
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            let article_count: i64 = row
                .try_get("article_count")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            views.push(SubscriptionView {
                subscription: SubscriptionRow::from_row(row)?.into_subscription()?,
                link: LinkRow::from_row(row, "link_")?.into_link()?,
                article_count: article_count as u64,
            });
        }
        Ok((views, total as u64))
    }

    async fn list_articles(
        &self,
        subscription_id: i64,
        page: PageRequest,
    ) -> Result<(Vec<Article>, u64), RepositoryError> {
        self.fetch_articles(ArticleScope::Subscription(subscription_id), page)
            .await
    }

    async fn list_user_articles(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<(Vec<Article>, u64), RepositoryError> {
        self.fetch_articles(ArticleScope::User(user_id), page).await
    }

    async fn insert_article(
        &self,
        subscription_id: i64,
        article: &NewArticle,
        now: DateTime<Utc>,
    ) -> Result<Article, RepositoryError> {
        let now_text = format_datetime(&now);
        let id = sqlx::query(
            r#"INSERT INTO subscription_articles (subscription_id, title, summary, content, author, published_at, url, key_points, journal_name, read_count, citation_count, rating, state, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?)"#,
        )
        .bind(subscription_id)
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(&article.author)
        .bind(article.published_at.as_ref().map(format_datetime))
        .bind(&article.url)
        .bind(&article.key_points)
        .bind(&article.journal_name)
        .bind(article.citation_count as i64)
        .bind(article.rating)
        .bind(RecordState::Live.to_string())
        .bind(&now_text)
        .bind(&now_text)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?
        .last_insert_rowid();

        Ok(Article {
            id,
            subscription_id,
            title: article.title.clone(),
            summary: article.summary.clone(),
            content: article.content.clone(),
            author: article.author.clone(),
            published_at: article.published_at,
            url: article.url.clone(),
            key_points: article.key_points.clone(),
            journal_name: article.journal_name.clone(),
            read_count: 0,
            citation_count: article.citation_count,
            rating: article.rating,
            created_at: now,
            updated_at: now,
        })
    }

    async fn soft_delete_article(
        &self,
        article_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE subscription_articles SET state = ?, updated_at = ? WHERE id = ? AND state = ?",
        )
        .bind(RecordState::Deleted.to_string())
        .bind(format_datetime(&now))
        .bind(article_id)
        .bind(RecordState::Live.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use parley_core::subscription::reconciler::SubscriptionReconciler;
    use parley_types::config::ParleyConfig;
    use parley_types::error::ServiceError;
    use parley_types::subscription::SubscribeOutcome;
    use std::sync::Arc;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    async fn test_reconciler() -> SubscriptionReconciler<SqliteSubscriptionRepository> {
        let repo = SqliteSubscriptionRepository::new(test_pool().await);
        SubscriptionReconciler::new(repo, Arc::new(ParleyConfig::default()))
    }

    async fn link_rows(pool: &DatabasePool, user: UserId, subscription_id: i64) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_subscriptions WHERE user_id = ? AND subscription_id = ?",
        )
        .bind(user.0)
        .bind(subscription_id)
        .fetch_one(&pool.reader)
        .await
        .unwrap()
    }

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    fn article(title: &str, published_days_ago: Option<i64>) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            published_at: published_days_ago.map(|d| Utc::now() - Duration::days(d)),
            rating: 8.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_link_uniqueness_is_enforced_by_schema() {
        let reconciler = test_reconciler().await;
        let repo = reconciler.repo();
        let created = reconciler.subscribe(ALICE, "ml", "").await.unwrap();

        let err = repo
            .insert_link(ALICE, created.subscription_id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_active_topic_uniqueness_is_enforced_by_schema() {
        let reconciler = test_reconciler().await;
        let repo = reconciler.repo();
        let input = NewSubscription {
            creator_id: ALICE,
            topic_name: "ml".to_string(),
            description: String::new(),
        };
        repo.create_subscription_with_link(&input, Utc::now()).await.unwrap();

        let rival = NewSubscription {
            creator_id: BOB,
            ..input
        };
        let err = repo
            .create_subscription_with_link(&rival, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        // The failed transaction left no orphan subscription behind.
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions")
            .fetch_one(&reconciler.repo().pool.reader)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_subscribe_twice_keeps_one_link() {
        let reconciler = test_reconciler().await;
        let first = reconciler.subscribe(ALICE, "ml", "machine learning").await.unwrap();
        let second = reconciler.subscribe(ALICE, "ml", "").await.unwrap();

        assert_eq!(first.outcome, SubscribeOutcome::Created);
        assert_eq!(second.outcome, SubscribeOutcome::AlreadyActive);
        assert_eq!(first.subscription_id, second.subscription_id);
        assert_eq!(link_rows(&reconciler.repo().pool, ALICE, first.subscription_id).await, 1);
    }

    #[tokio::test]
    async fn test_cancel_reactivate_round_trip() {
        let reconciler = test_reconciler().await;
        let pool = reconciler.repo().pool.clone();
        let id = reconciler.subscribe(ALICE, "ml", "").await.unwrap().subscription_id;

        reconciler.cancel(ALICE, id).await.unwrap();
        assert_eq!(link_rows(&pool, ALICE, id).await, 1);
        reconciler.reactivate(ALICE, id).await.unwrap();
        assert_eq!(link_rows(&pool, ALICE, id).await, 1);
        let last = reconciler.cancel(ALICE, id).await.unwrap();
        assert_eq!(last.current, LinkStatus::Cancelled);
        assert_eq!(link_rows(&pool, ALICE, id).await, 1);

        let link = reconciler.repo().find_link(ALICE, id).await.unwrap().unwrap();
        assert_eq!(link.status, LinkStatus::Cancelled);
        assert_eq!(reconciler.list_for_user(ALICE, None, None).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_cancel_by_non_member_is_denied() {
        let reconciler = test_reconciler().await;
        let id = reconciler.subscribe(ALICE, "ml", "").await.unwrap().subscription_id;

        let err = reconciler.cancel(BOB, id).await.unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));
        let link = reconciler.repo().find_link(ALICE, id).await.unwrap().unwrap();
        assert_eq!(link.status, LinkStatus::Active);
    }

    #[tokio::test]
    async fn test_concurrent_first_subscribes_share_one_link() {
        let reconciler = Arc::new(test_reconciler().await);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reconciler = Arc::clone(&reconciler);
                tokio::spawn(async move { reconciler.subscribe(ALICE, "brand-new", "").await })
            })
            .collect();

        let results: Vec<_> = futures_util::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        let id = results[0].subscription_id;
        assert!(results.iter().all(|r| r.subscription_id == id));
        assert_eq!(
            results
                .iter()
                .filter(|r| r.outcome == SubscribeOutcome::Created)
                .count(),
            1
        );
        assert_eq!(link_rows(&reconciler.repo().pool, ALICE, id).await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_users_join_the_same_subscription() {
        let reconciler = Arc::new(test_reconciler().await);

        let handles: Vec<_> = (1..=6)
            .map(|user| {
                let reconciler = Arc::clone(&reconciler);
                tokio::spawn(async move { reconciler.subscribe(UserId(user), "shared", "").await })
            })
            .collect();

        let results: Vec<_> = futures_util::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        let id = results[0].subscription_id;
        assert!(results.iter().all(|r| r.subscription_id == id));
        let subscriptions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions")
            .fetch_one(&reconciler.repo().pool.reader)
            .await
            .unwrap();
        assert_eq!(subscriptions, 1);
        for user in 1..=6 {
            assert_eq!(link_rows(&reconciler.repo().pool, UserId(user), id).await, 1);
        }
    }

    #[tokio::test]
    async fn test_delete_keeps_links_but_hides_membership() {
        let reconciler = test_reconciler().await;
        let id = reconciler.subscribe(ALICE, "ml", "").await.unwrap().subscription_id;
        reconciler
            .create_article(id, article("Attention", Some(1)))
            .await
            .unwrap();

        reconciler.delete(id).await.unwrap();

        assert_eq!(link_rows(&reconciler.repo().pool, ALICE, id).await, 1);
        assert_eq!(reconciler.list_for_user(ALICE, None, None).await.unwrap().total, 0);
        assert_eq!(
            reconciler
                .list_all_articles_for_user(ALICE, None, None)
                .await
                .unwrap()
                .total,
            0
        );
        let err = reconciler.list_articles(ALICE, id, None, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        // The topic is free again.
        let fresh = reconciler.subscribe(ALICE, "ml", "").await.unwrap();
        assert_eq!(fresh.outcome, SubscribeOutcome::Created);
        assert_ne!(fresh.subscription_id, id);
    }

    #[tokio::test]
    async fn test_list_views_count_live_articles() {
        let reconciler = test_reconciler().await;
        let ml = reconciler.subscribe(ALICE, "ml", "").await.unwrap().subscription_id;
        reconciler.subscribe(ALICE, "rust", "").await.unwrap();

        let kept = reconciler.create_article(ml, article("Kept", Some(2))).await.unwrap();
        let gone = reconciler.create_article(ml, article("Gone", Some(1))).await.unwrap();
        reconciler.delete_article(gone.id).await.unwrap();

        let stored: String =
            sqlx::query_scalar("SELECT state FROM subscription_articles WHERE id = ?")
                .bind(gone.id)
                .fetch_one(&reconciler.repo().pool.reader)
                .await
                .unwrap();
        assert_eq!(stored.parse::<RecordState>().unwrap(), RecordState::Deleted);

        let page = reconciler.list_for_user(ALICE, None, None).await.unwrap();
        assert_eq!(page.total, 2);
        let view = page
            .items
            .iter()
            .find(|v| v.subscription.id == ml)
            .unwrap();
        assert_eq!(view.article_count, 1);
        assert_eq!(view.link.user_id, ALICE);
        assert_eq!(view.link.status, LinkStatus::Active);

        let articles = reconciler.list_articles(ALICE, ml, None, None).await.unwrap();
        assert_eq!(articles.total, 1);
        assert_eq!(articles.items[0].id, kept.id);
    }

    #[tokio::test]
    async fn test_articles_newest_publication_first() {
        let reconciler = test_reconciler().await;
        let id = reconciler.subscribe(ALICE, "ml", "").await.unwrap().subscription_id;
        reconciler.create_article(id, article("Old", Some(30))).await.unwrap();
        reconciler.create_article(id, article("Undated", None)).await.unwrap();
        reconciler.create_article(id, article("New", Some(1))).await.unwrap();

        let page = reconciler.list_articles(ALICE, id, None, None).await.unwrap();
        let titles: Vec<&str> = page.items.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Old", "Undated"]);

        let err = reconciler.list_articles(BOB, id, None, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));
        let all = reconciler.list_all_articles_for_user(ALICE, None, Some(2)).await.unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items.len(), 2);
    }

    #[tokio::test]
    async fn test_update_description_persists() {
        let reconciler = test_reconciler().await;
        let id = reconciler.subscribe(ALICE, "ml", "old").await.unwrap().subscription_id;
        reconciler.update_description(ALICE, id, "new").await.unwrap();

        let stored = reconciler.repo().get_subscription(id).await.unwrap().unwrap();
        assert_eq!(stored.description, "new");

        reconciler.delete(id).await.unwrap();
        let err = reconciler.update_description(ALICE, id, "late").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
