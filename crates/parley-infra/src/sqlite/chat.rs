//! SQLite chat repository implementation.
//!
//! Implements `ChatRepository` and `AggregateStore` from `parley-core` using
//! sqlx with split read/write pools. Listing queries are assembled from the
//! live-row builders in [`super::scope`].

use chrono::{DateTime, Utc};
use parley_core::chat::repository::{AggregateStore, ChatRepository};
use parley_types::chat::{
    ChatMessage, ChatSession, MessageRole, MessageStats, MessageStatus, MessageUpdate,
    ModelUsage, SessionAggregate, SessionStats, SessionStatus, SessionsDeleted,
};
use parley_types::error::RepositoryError;
use parley_types::page::PageRequest;
use parley_types::record::RecordState;
use parley_types::user::UserId;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::pool::DatabasePool;
use super::scope::{self, MessageScope, SessionScope};
use super::{format_datetime, map_sqlx_error, parse_datetime};

/// SQLite-backed implementation of `ChatRepository`.
#[derive(Clone)]
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch_sessions(
        &self,
        scope: SessionScope,
        page: PageRequest,
    ) -> Result<(Vec<ChatSession>, u64), RepositoryError> {
        let total = self.count(scope::sessions("COUNT(*)", &scope)).await?;

        let mut qb = scope::sessions("s.*", &scope);
        qb.push(" ORDER BY s.created_at DESC, s.id DESC");
        scope::push_page(&mut qb, page);
        let rows = qb
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            sessions.push(ChatSessionRow::from_row(row)?.into_session()?);
        }
        Ok((sessions, total))
    }

    async fn fetch_messages(
        &self,
        scope: MessageScope,
        order: &str,
        page: PageRequest,
    ) -> Result<(Vec<ChatMessage>, u64), RepositoryError> {
        let total = self.count(scope::messages("COUNT(*)", &scope)).await?;

        let mut qb = scope::messages("m.*", &scope);
        qb.push(order);
        scope::push_page(&mut qb, page);
        let messages = self.collect_messages(qb).await?;
        Ok((messages, total))
    }

    async fn collect_messages(
        &self,
        mut qb: QueryBuilder<'static, Sqlite>,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = qb
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            messages.push(ChatMessageRow::from_row(row)?.into_message()?);
        }
        Ok(messages)
    }

    async fn count(&self, mut qb: QueryBuilder<'static, Sqlite>) -> Result<u64, RepositoryError> {
        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count as u64)
    }

    async fn message_stats(&self, scope: MessageScope) -> Result<MessageStats, RepositoryError> {
        let mut qb = scope::messages(
            "COUNT(*) AS total_messages, \
             COALESCE(SUM(CASE WHEN m.role = 'user' THEN 1 ELSE 0 END), 0) AS user_messages, \
             COALESCE(SUM(CASE WHEN m.role = 'assistant' THEN 1 ELSE 0 END), 0) AS assistant_messages, \
             COALESCE(SUM(CASE WHEN m.role = 'system' THEN 1 ELSE 0 END), 0) AS system_messages, \
             COALESCE(SUM(m.tokens), 0) AS total_tokens, \
             CAST(COALESCE(SUM(m.cost), 0) AS REAL) AS total_cost",
            &scope,
        );
        let row = qb
            .build()
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let total_messages = get_i64(&row, "total_messages")? as u64;
        let total_tokens = get_i64(&row, "total_tokens")? as u64;
        let avg_tokens_per_message = if total_messages == 0 {
            0.0
        } else {
            total_tokens as f64 / total_messages as f64
        };

        Ok(MessageStats {
            total_messages,
            user_messages: get_i64(&row, "user_messages")? as u64,
            assistant_messages: get_i64(&row, "assistant_messages")? as u64,
            system_messages: get_i64(&row, "system_messages")? as u64,
            total_tokens,
            total_cost: get_f64(&row, "total_cost")?,
            avg_tokens_per_message,
        })
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain ChatSession.
struct ChatSessionRow {
    session_id: String,
    user_id: i64,
    topic: String,
    model: String,
    channel_id: i64,
    message_count: i64,
    token_count: i64,
    total_cost: f64,
    status: String,
    created_at: String,
    updated_at: String,
    last_message_at: Option<String>,
}

impl ChatSessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, RepositoryError> {
        let read = || -> Result<Self, sqlx::Error> {
            Ok(Self {
                session_id: row.try_get("session_id")?,
                user_id: row.try_get("user_id")?,
                topic: row.try_get("topic")?,
                model: row.try_get("model")?,
                channel_id: row.try_get("channel_id")?,
                message_count: row.try_get("message_count")?,
                token_count: row.try_get("token_count")?,
                total_cost: row.try_get("total_cost")?,
                status: row.try_get("status")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
                last_message_at: row.try_get("last_message_at")?,
            })
        };
        read().map_err(|e| RepositoryError::Query(e.to_string()))
    }

    fn into_session(self) -> Result<ChatSession, RepositoryError> {
        let id = Uuid::parse_str(&self.session_id)
            .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?;
        let status: SessionStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let last_message_at = self
            .last_message_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(ChatSession {
            id,
            user_id: UserId(self.user_id),
            topic: self.topic,
            model: self.model,
            channel_id: self.channel_id,
            message_count: self.message_count as u32,
            token_count: self.token_count as u64,
            total_cost: self.total_cost,
            status,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            last_message_at,
        })
    }
}

/// Internal row type for mapping SQLite rows to domain ChatMessage.
struct ChatMessageRow {
    message_id: String,
    session_id: String,
    role: String,
    content: String,
    tokens: i64,
    cost: f64,
    status: String,
    error_msg: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ChatMessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, RepositoryError> {
        let read = || -> Result<Self, sqlx::Error> {
            Ok(Self {
                message_id: row.try_get("message_id")?,
                session_id: row.try_get("session_id")?,
                role: row.try_get("role")?,
                content: row.try_get("content")?,
                tokens: row.try_get("tokens")?,
                cost: row.try_get("cost")?,
                status: row.try_get("status")?,
                error_msg: row.try_get("error_msg")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        };
        read().map_err(|e| RepositoryError::Query(e.to_string()))
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let id = Uuid::parse_str(&self.message_id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let session_id = Uuid::parse_str(&self.session_id)
            .map_err(|e| RepositoryError::Query(format!("invalid session_id: {e}")))?;
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let status: MessageStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(ChatMessage {
            id,
            session_id,
            role,
            content: self.content,
            tokens: self.tokens as u32,
            cost: self.cost,
            status,
            error_msg: self.error_msg,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn get_i64(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<i64, RepositoryError> {
    row.try_get(column)
        .map_err(|e| RepositoryError::Query(e.to_string()))
}

fn get_f64(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<f64, RepositoryError> {
    row.try_get(column)
        .map_err(|e| RepositoryError::Query(e.to_string()))
}

// ---------------------------------------------------------------------------
// AggregateStore implementation
// ---------------------------------------------------------------------------

impl AggregateStore for SqliteChatRepository {
    async fn recompute_aggregate(
        &self,
        session_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionAggregate>, RepositoryError> {
        let id = session_id.to_string();
        let now_text = format_datetime(&now);
        let live = RecordState::Live.to_string();

        let rows = sqlx::query(
            r#"UPDATE chat_sessions
               SET message_count = (SELECT COUNT(*) FROM chat_messages
                                    WHERE session_id = ? AND state = ?),
                   token_count   = (SELECT COALESCE(SUM(tokens), 0) FROM chat_messages
                                    WHERE session_id = ? AND state = ?),
                   total_cost    = (SELECT CAST(COALESCE(SUM(cost), 0) AS REAL) FROM chat_messages
                                    WHERE session_id = ? AND state = ?),
                   last_message_at = ?,
                   updated_at = ?
               WHERE session_id = ? AND status != ?
               RETURNING message_count, token_count, total_cost"#,
        )
        .bind(&id)
        .bind(&live)
        .bind(&id)
        .bind(&live)
        .bind(&id)
        .bind(&live)
        .bind(&now_text)
        .bind(&now_text)
        .bind(&id)
        .bind(SessionStatus::Deleted.to_string())
        .fetch_all(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };

        Ok(Some(SessionAggregate {
            session_id: *session_id,
            message_count: get_i64(row, "message_count")? as u32,
            token_count: get_i64(row, "token_count")? as u64,
            total_cost: get_f64(row, "total_cost")?,
            last_message_at: now,
        }))
    }
}

// ---------------------------------------------------------------------------
// ChatRepository implementation
// ---------------------------------------------------------------------------

impl ChatRepository for SqliteChatRepository {
    async fn create_session(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO chat_sessions (session_id, user_id, topic, model, channel_id, message_count, token_count, total_cost, status, created_at, updated_at, last_message_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(session.id.to_string())
        .bind(session.user_id.0)
        .bind(&session.topic)
        .bind(&session.model)
        .bind(session.channel_id)
        .bind(session.message_count as i64)
        .bind(session.token_count as i64)
        .bind(session.total_cost)
        .bind(session.status.to_string())
        .bind(format_datetime(&session.created_at))
        .bind(format_datetime(&session.updated_at))
        .bind(session.last_message_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await;

        match result.map_err(map_sqlx_error) {
            Ok(_) => Ok(()),
            Err(RepositoryError::Conflict(_)) => Err(RepositoryError::Conflict(format!(
                "session '{}' already exists",
                session.id
            ))),
            Err(e) => Err(e),
        }
    }

    async fn get_session(&self, session_id: &Uuid) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM chat_sessions WHERE session_id = ? AND status != ?",
        )
        .bind(session_id.to_string())
        .bind(SessionStatus::Deleted.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Some(ChatSessionRow::from_row(&row)?.into_session()?)),
            None => Ok(None),
        }
    }

    async fn update_session_topic(
        &self,
        session_id: &Uuid,
        topic: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE chat_sessions SET topic = ?, updated_at = ? WHERE session_id = ? AND status != ?",
        )
        .bind(topic)
        .bind(format_datetime(&now))
        .bind(session_id.to_string())
        .bind(SessionStatus::Deleted.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_session_status(
        &self,
        session_id: &Uuid,
        status: SessionStatus,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE chat_sessions SET status = ?, updated_at = ? WHERE session_id = ? AND status != ?",
        )
        .bind(status.to_string())
        .bind(format_datetime(&now))
        .bind(session_id.to_string())
        .bind(SessionStatus::Deleted.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_session_cascade(
        &self,
        session_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let id = session_id.to_string();
        let now_text = format_datetime(&now);
        let deleted = SessionStatus::Deleted.to_string();

        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            "UPDATE chat_sessions SET status = ?, updated_at = ? WHERE session_id = ? AND status != ?",
        )
        .bind(&deleted)
        .bind(&now_text)
        .bind(&id)
        .bind(&deleted)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(RepositoryError::NotFound);
        }

        let messages = sqlx::query(
            "UPDATE chat_messages SET state = ?, updated_at = ? WHERE session_id = ? AND state = ?",
        )
        .bind(RecordState::Deleted.to_string())
        .bind(&now_text)
        .bind(&id)
        .bind(RecordState::Live.to_string())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(messages.rows_affected())
    }

    async fn delete_user_sessions(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<SessionsDeleted, RepositoryError> {
        let now_text = format_datetime(&now);
        let deleted = SessionStatus::Deleted.to_string();

        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        // Messages first, while their sessions still match the live filter.
        let messages = sqlx::query(
            r#"UPDATE chat_messages SET state = ?, updated_at = ?
               WHERE state = ? AND session_id IN
                   (SELECT session_id FROM chat_sessions WHERE user_id = ? AND status != ?)"#,
        )
        .bind(RecordState::Deleted.to_string())
        .bind(&now_text)
        .bind(RecordState::Live.to_string())
        .bind(user_id.0)
        .bind(&deleted)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let sessions = sqlx::query(
            "UPDATE chat_sessions SET status = ?, updated_at = ? WHERE user_id = ? AND status != ?",
        )
        .bind(&deleted)
        .bind(&now_text)
        .bind(user_id.0)
        .bind(&deleted)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(SessionsDeleted {
            sessions: sessions.rows_affected(),
            messages: messages.rows_affected(),
        })
    }

    async fn list_sessions(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<(Vec<ChatSession>, u64), RepositoryError> {
        self.fetch_sessions(SessionScope::User(user_id), page).await
    }

    async fn search_sessions(
        &self,
        user_id: UserId,
        keyword: &str,
        page: PageRequest,
    ) -> Result<(Vec<ChatSession>, u64), RepositoryError> {
        self.fetch_sessions(SessionScope::UserTopic(user_id, keyword.to_string()), page)
            .await
    }

    async fn session_stats(&self, user_id: UserId) -> Result<SessionStats, RepositoryError> {
        let mut qb = scope::sessions(
            "COUNT(*) AS total_sessions, \
             COALESCE(SUM(CASE WHEN s.status = 'active' THEN 1 ELSE 0 END), 0) AS active_sessions, \
             COALESCE(SUM(s.message_count), 0) AS total_messages, \
             COALESCE(SUM(s.token_count), 0) AS total_tokens, \
             CAST(COALESCE(SUM(s.total_cost), 0) AS REAL) AS total_cost",
            &SessionScope::User(user_id),
        );
        let row = qb
            .build()
            .fetch_one(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let total_sessions = get_i64(&row, "total_sessions")? as u64;
        let total_messages = get_i64(&row, "total_messages")? as u64;
        let avg_messages_per_session = if total_sessions == 0 {
            0.0
        } else {
            total_messages as f64 / total_sessions as f64
        };

        Ok(SessionStats {
            total_sessions,
            active_sessions: get_i64(&row, "active_sessions")? as u64,
            total_messages,
            total_tokens: get_i64(&row, "total_tokens")? as u64,
            total_cost: get_f64(&row, "total_cost")?,
            avg_messages_per_session,
        })
    }

    async fn model_usage(&self, user_id: UserId) -> Result<Vec<ModelUsage>, RepositoryError> {
        let mut qb = scope::sessions(
            "s.model AS model, \
             COUNT(*) AS session_count, \
             COALESCE(SUM(s.message_count), 0) AS message_count, \
             COALESCE(SUM(s.token_count), 0) AS total_tokens, \
             CAST(COALESCE(SUM(s.total_cost), 0) AS REAL) AS total_cost",
            &SessionScope::User(user_id),
        );
        qb.push(" GROUP BY s.model ORDER BY total_cost DESC, s.model ASC");
        let rows = qb
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        let mut usage = Vec::with_capacity(rows.len());
        for row in &rows {
            usage.push(ModelUsage {
                model: row
                    .try_get("model")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                session_count: get_i64(row, "session_count")? as u64,
                message_count: get_i64(row, "message_count")? as u64,
                total_tokens: get_i64(row, "total_tokens")? as u64,
                total_cost: get_f64(row, "total_cost")?,
            });
        }
        Ok(usage)
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO chat_messages (message_id, session_id, role, content, tokens, cost, status, error_msg, state, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.session_id.to_string())
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(message.tokens as i64)
        .bind(message.cost)
        .bind(message.status.to_string())
        .bind(&message.error_msg)
        .bind(RecordState::Live.to_string())
        .bind(format_datetime(&message.created_at))
        .bind(format_datetime(&message.updated_at))
        .execute(&self.pool.writer)
        .await;

        match result.map_err(map_sqlx_error) {
            Ok(_) => Ok(()),
            Err(RepositoryError::Conflict(_)) => Err(RepositoryError::Conflict(format!(
                "message '{}' already exists",
                message.id
            ))),
            Err(e) => Err(e),
        }
    }

    async fn get_message(&self, message_id: &Uuid) -> Result<Option<ChatMessage>, RepositoryError> {
        let messages = self
            .collect_messages(scope::messages("m.*", &MessageScope::Id(*message_id)))
            .await?;
        Ok(messages.into_iter().next())
    }

    async fn update_message(
        &self,
        message_id: &Uuid,
        update: &MessageUpdate,
        now: DateTime<Utc>,
    ) -> Result<ChatMessage, RepositoryError> {
        // Untouched columns keep their stored value, so concurrent updates of
        // disjoint fields both survive. A row that ends up `normal` never
        // keeps error text.
        let status = update.status.map(|s| s.to_string());
        let rows = sqlx::query(
            r#"UPDATE chat_messages
               SET content = COALESCE(?, content),
                   tokens = COALESCE(?, tokens),
                   cost = COALESCE(?, cost),
                   status = COALESCE(?, status),
                   error_msg = CASE WHEN COALESCE(?, status) = ? THEN NULL
                                    ELSE COALESCE(?, error_msg) END,
                   updated_at = ?
               WHERE message_id = ? AND state = ?
               RETURNING *"#,
        )
        .bind(update.content.as_deref())
        .bind(update.tokens.map(i64::from))
        .bind(update.cost)
        .bind(status.as_deref())
        .bind(status.as_deref())
        .bind(MessageStatus::Normal.to_string())
        .bind(update.error_msg.as_deref())
        .bind(format_datetime(&now))
        .bind(message_id.to_string())
        .bind(RecordState::Live.to_string())
        .fetch_all(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        match rows.first() {
            Some(row) => ChatMessageRow::from_row(row)?.into_message(),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn soft_delete_message(
        &self,
        message_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE chat_messages SET state = ?, updated_at = ? WHERE message_id = ? AND state = ?",
        )
        .bind(RecordState::Deleted.to_string())
        .bind(format_datetime(&now))
        .bind(message_id.to_string())
        .bind(RecordState::Live.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_session_messages(
        &self,
        session_id: &Uuid,
        page: PageRequest,
    ) -> Result<(Vec<ChatMessage>, u64), RepositoryError> {
        self.fetch_messages(
            MessageScope::Session(*session_id),
            " ORDER BY m.created_at ASC, m.id ASC",
            page,
        )
        .await
    }

    async fn list_user_messages(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<(Vec<ChatMessage>, u64), RepositoryError> {
        self.fetch_messages(MessageScope::User(user_id), NEWEST_FIRST, page)
            .await
    }

    async fn search_user_messages(
        &self,
        user_id: UserId,
        keyword: &str,
        page: PageRequest,
    ) -> Result<(Vec<ChatMessage>, u64), RepositoryError> {
        self.fetch_messages(
            MessageScope::UserContent(user_id, keyword.to_string()),
            NEWEST_FIRST,
            page,
        )
        .await
    }

    async fn error_messages(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<(Vec<ChatMessage>, u64), RepositoryError> {
        self.fetch_messages(MessageScope::UserErrors(user_id), NEWEST_FIRST, page)
            .await
    }

    async fn recent_messages(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut qb = scope::messages("m.*", &MessageScope::User(user_id));
        qb.push(NEWEST_FIRST);
        qb.push(" LIMIT ").push_bind(limit as i64);
        self.collect_messages(qb).await
    }

    async fn session_message_stats(&self, session_id: &Uuid) -> Result<MessageStats, RepositoryError> {
        self.message_stats(MessageScope::Session(*session_id)).await
    }

    async fn user_message_stats(&self, user_id: UserId) -> Result<MessageStats, RepositoryError> {
        self.message_stats(MessageScope::User(user_id)).await
    }
}

const NEWEST_FIRST: &str = " ORDER BY m.created_at DESC, m.id DESC";
