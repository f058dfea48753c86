//! Chat service: session and message lifecycle.
//!
//! Every operation takes the authenticated caller's `UserId`. Ownership is
//! checked against the session before any write; for messages the owning
//! session is re-resolved on every call. Each message mutation is followed by
//! an aggregate recompute whose outcome travels back in [`Recomputed`].

use std::sync::Arc;

use chrono::Utc;
use parley_types::chat::{
    ChatMessage, ChatSession, MAX_ERROR_MSG_CHARS, MAX_MODEL_CHARS, MAX_TOPIC_CHARS,
    MessageStats, MessageStatus, MessageUpdate, ModelUsage, NewMessage, NewSession, SessionStats,
    SessionStatus, SessionsDeleted,
};
use parley_types::config::ParleyConfig;
use parley_types::error::{RepositoryError, ServiceError};
use parley_types::page::{MAX_PAGE_SIZE, Page};
use parley_types::user::UserId;
use tracing::info;
use uuid::Uuid;

use crate::chat::aggregate::{AggregateOutcome, AggregateRecalculator, Recomputed};
use crate::chat::repository::ChatRepository;
use crate::ownership::{ensure_owner, found};
use crate::validate;

/// Orchestrates session lifecycle and message persistence.
///
/// Generic over `ChatRepository` to maintain clean architecture
/// (parley-core never depends on parley-infra).
pub struct ChatService<C: ChatRepository> {
    repo: C,
    config: Arc<ParleyConfig>,
}

impl<C: ChatRepository> ChatService<C> {
    /// Create a new chat service over `repo` with a configuration snapshot.
    pub fn new(repo: C, config: Arc<ParleyConfig>) -> Self {
        Self { repo, config }
    }

    /// Access the chat repository.
    pub fn repo(&self) -> &C {
        &self.repo
    }

    // --- Session lifecycle ---

    /// Create an active session with a zero roll-up.
    pub async fn create_session(
        &self,
        user: UserId,
        input: NewSession,
    ) -> Result<ChatSession, ServiceError> {
        let topic = validate::required_text("topic", &input.topic, MAX_TOPIC_CHARS)?;
        let model = match input.model {
            Some(model) => validate::required_text("model", &model, MAX_MODEL_CHARS)?,
            None => self.config.sessions.default_model.clone(),
        };

        let now = Utc::now();
        let session = ChatSession {
            id: Uuid::now_v7(),
            user_id: user,
            topic,
            model,
            channel_id: input.channel_id.unwrap_or(1),
            message_count: 0,
            token_count: 0,
            total_cost: 0.0,
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
            last_message_at: None,
        };

        self.repo
            .create_session(&session)
            .await
            .map_err(|e| already_exists_on_conflict(e, || format!("session {}", session.id)))?;

        info!(session_id = %session.id, user_id = %user, "Session created");
        Ok(session)
    }

    /// Get a session owned by `user`.
    pub async fn get_session(
        &self,
        user: UserId,
        session_id: &Uuid,
    ) -> Result<ChatSession, ServiceError> {
        self.owned_session(user, session_id).await
    }

    pub async fn update_topic(
        &self,
        user: UserId,
        session_id: &Uuid,
        topic: &str,
    ) -> Result<ChatSession, ServiceError> {
        let topic = validate::required_text("topic", topic, MAX_TOPIC_CHARS)?;
        let mut session = self.owned_session(user, session_id).await?;

        let now = Utc::now();
        self.repo.update_session_topic(session_id, &topic, now).await?;
        session.topic = topic;
        session.updated_at = now;

        info!(session_id = %session_id, "Session topic updated");
        Ok(session)
    }

    /// Mark a session as ended. Ending an ended session is a no-op.
    pub async fn end_session(
        &self,
        user: UserId,
        session_id: &Uuid,
    ) -> Result<ChatSession, ServiceError> {
        let mut session = self.owned_session(user, session_id).await?;
        if session.status == SessionStatus::Ended {
            return Ok(session);
        }

        let now = Utc::now();
        self.repo
            .set_session_status(session_id, SessionStatus::Ended, now)
            .await?;
        session.status = SessionStatus::Ended;
        session.updated_at = now;

        info!(session_id = %session_id, "Session ended");
        Ok(session)
    }

    /// Soft-delete a session and all of its messages.
    ///
    /// No recompute follows: the roll-up of a deleted session is never read.
    /// Returns the number of messages removed with it.
    pub async fn delete_session(
        &self,
        user: UserId,
        session_id: &Uuid,
    ) -> Result<u64, ServiceError> {
        self.owned_session(user, session_id).await?;

        let removed = self
            .repo
            .delete_session_cascade(session_id, Utc::now())
            .await?;

        info!(session_id = %session_id, messages = removed, "Session deleted");
        Ok(removed)
    }

    /// Soft-delete all live sessions of `user` together with their messages.
    pub async fn delete_all_sessions(&self, user: UserId) -> Result<SessionsDeleted, ServiceError> {
        let deleted = self.repo.delete_user_sessions(user, Utc::now()).await?;
        info!(
            user_id = %user,
            sessions = deleted.sessions,
            messages = deleted.messages,
            "All sessions deleted"
        );
        Ok(deleted)
    }

    pub async fn list_sessions(
        &self,
        user: UserId,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<ChatSession>, ServiceError> {
        let request = self.config.pagination.sessions(page, page_size);
        let (items, total) = self.repo.list_sessions(user, request).await?;
        Ok(Page::new(items, total, request))
    }

    pub async fn search_sessions(
        &self,
        user: UserId,
        keyword: &str,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<ChatSession>, ServiceError> {
        let keyword = validate::keyword(keyword)?;
        let request = self.config.pagination.sessions(page, page_size);
        let (items, total) = self.repo.search_sessions(user, &keyword, request).await?;
        Ok(Page::new(items, total, request))
    }

    pub async fn session_stats(&self, user: UserId) -> Result<SessionStats, ServiceError> {
        Ok(self.repo.session_stats(user).await?)
    }

    pub async fn model_usage(&self, user: UserId) -> Result<Vec<ModelUsage>, ServiceError> {
        Ok(self.repo.model_usage(user).await?)
    }

    /// Recompute a session's roll-up on demand, e.g. after an earlier stale outcome.
    pub async fn recompute(
        &self,
        user: UserId,
        session_id: &Uuid,
    ) -> Result<AggregateOutcome, ServiceError> {
        self.owned_session(user, session_id).await?;
        Ok(self.recalculator().recompute(session_id).await)
    }

    // --- Message lifecycle ---

    /// Append a message to a session owned by `user`, then recompute the roll-up.
    pub async fn create_message(
        &self,
        user: UserId,
        session_id: &Uuid,
        input: NewMessage,
    ) -> Result<Recomputed<ChatMessage>, ServiceError> {
        self.validate_new_message(&input)?;
        self.owned_session(user, session_id).await?;

        let now = Utc::now();
        let message = ChatMessage {
            id: input.id.unwrap_or_else(Uuid::now_v7),
            session_id: *session_id,
            role: input.role,
            content: input.content,
            tokens: input.tokens,
            cost: input.cost,
            status: input.status,
            error_msg: match input.status {
                MessageStatus::Error => input.error_msg,
                MessageStatus::Normal => None,
            },
            created_at: now,
            updated_at: now,
        };

        self.repo
            .insert_message(&message)
            .await
            .map_err(|e| already_exists_on_conflict(e, || format!("message {}", message.id)))?;

        info!(session_id = %session_id, message_id = %message.id, "Message created");
        let aggregate = self.recalculator().recompute(session_id).await;
        Ok(Recomputed {
            value: message,
            aggregate,
        })
    }

    /// Get a live message whose session is owned by `user`.
    pub async fn get_message(
        &self,
        user: UserId,
        message_id: &Uuid,
    ) -> Result<ChatMessage, ServiceError> {
        self.owned_message(user, message_id).await
    }

    pub async fn update_message(
        &self,
        user: UserId,
        message_id: &Uuid,
        update: MessageUpdate,
    ) -> Result<Recomputed<ChatMessage>, ServiceError> {
        self.validate_update(&update)?;
        self.owned_message(user, message_id).await?;

        let message = self
            .repo
            .update_message(message_id, &update, Utc::now())
            .await?;

        info!(session_id = %message.session_id, message_id = %message_id, "Message updated");
        let aggregate = self.recalculator().recompute(&message.session_id).await;
        Ok(Recomputed {
            value: message,
            aggregate,
        })
    }

    /// Soft-delete a message, then recompute the roll-up.
    ///
    /// Returns the id of the session the message belonged to.
    pub async fn delete_message(
        &self,
        user: UserId,
        message_id: &Uuid,
    ) -> Result<Recomputed<Uuid>, ServiceError> {
        let message = self.owned_message(user, message_id).await?;

        self.repo.soft_delete_message(message_id, Utc::now()).await?;

        info!(session_id = %message.session_id, message_id = %message_id, "Message deleted");
        let aggregate = self.recalculator().recompute(&message.session_id).await;
        Ok(Recomputed {
            value: message.session_id,
            aggregate,
        })
    }

    pub async fn list_messages(
        &self,
        user: UserId,
        session_id: &Uuid,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<ChatMessage>, ServiceError> {
        self.owned_session(user, session_id).await?;
        let request = self.config.pagination.messages(page, page_size);
        let (items, total) = self.repo.list_session_messages(session_id, request).await?;
        Ok(Page::new(items, total, request))
    }

    pub async fn list_user_messages(
        &self,
        user: UserId,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<ChatMessage>, ServiceError> {
        let request = self.config.pagination.messages(page, page_size);
        let (items, total) = self.repo.list_user_messages(user, request).await?;
        Ok(Page::new(items, total, request))
    }

    pub async fn search_messages(
        &self,
        user: UserId,
        keyword: &str,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<ChatMessage>, ServiceError> {
        let keyword = validate::keyword(keyword)?;
        let request = self.config.pagination.messages(page, page_size);
        let (items, total) = self
            .repo
            .search_user_messages(user, &keyword, request)
            .await?;
        Ok(Page::new(items, total, request))
    }

    pub async fn error_messages(
        &self,
        user: UserId,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<ChatMessage>, ServiceError> {
        let request = self.config.pagination.messages(page, page_size);
        let (items, total) = self.repo.error_messages(user, request).await?;
        Ok(Page::new(items, total, request))
    }

    /// Newest live messages of `user`; `limit` is clamped to `1..=100`.
    pub async fn recent_messages(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, ServiceError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        Ok(self.repo.recent_messages(user, limit).await?)
    }

    pub async fn session_message_stats(
        &self,
        user: UserId,
        session_id: &Uuid,
    ) -> Result<MessageStats, ServiceError> {
        self.owned_session(user, session_id).await?;
        Ok(self.repo.session_message_stats(session_id).await?)
    }

    pub async fn user_message_stats(&self, user: UserId) -> Result<MessageStats, ServiceError> {
        Ok(self.repo.user_message_stats(user).await?)
    }

    // --- Helpers ---

    fn recalculator(&self) -> AggregateRecalculator<'_, C> {
        AggregateRecalculator::new(&self.repo)
    }

    async fn owned_session(
        &self,
        user: UserId,
        session_id: &Uuid,
    ) -> Result<ChatSession, ServiceError> {
        let session = found(self.repo.get_session(session_id).await?, || {
            format!("session {session_id}")
        })?;
        ensure_owner(&session, user)?;
        Ok(session)
    }

    /// Resolve a message and check ownership through its parent session.
    async fn owned_message(
        &self,
        user: UserId,
        message_id: &Uuid,
    ) -> Result<ChatMessage, ServiceError> {
        let message = found(self.repo.get_message(message_id).await?, || {
            format!("message {message_id}")
        })?;
        self.owned_session(user, &message.session_id).await?;
        Ok(message)
    }

    fn validate_new_message(&self, input: &NewMessage) -> Result<(), ServiceError> {
        validate::required_text("content", &input.content, self.config.limits.max_message_chars)?;
        validate::cost("cost", input.cost)?;
        if let Some(error_msg) = &input.error_msg {
            validate::bounded_text("error_msg", error_msg, MAX_ERROR_MSG_CHARS)?;
        }
        Ok(())
    }

    fn validate_update(&self, update: &MessageUpdate) -> Result<(), ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::ValidationFailed(
                "message update has no fields".to_string(),
            ));
        }
        if let Some(content) = &update.content {
            validate::required_text("content", content, self.config.limits.max_message_chars)?;
        }
        if let Some(cost) = update.cost {
            validate::cost("cost", cost)?;
        }
        if let Some(error_msg) = &update.error_msg {
            validate::bounded_text("error_msg", error_msg, MAX_ERROR_MSG_CHARS)?;
        }
        Ok(())
    }
}

/// A unique-key conflict on a plain insert is a duplicate, not a lost race.
fn already_exists_on_conflict(err: RepositoryError, what: impl FnOnce() -> String) -> ServiceError {
    match err {
        RepositoryError::Conflict(_) => ServiceError::AlreadyExists(what()),
        other => other.into(),
    }
}
