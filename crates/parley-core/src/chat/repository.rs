//! ChatRepository trait definition.
//!
//! Every read filters out soft-deleted rows: sessions with status `deleted`,
//! messages in state `deleted`, and messages whose session is deleted.

use chrono::{DateTime, Utc};
use parley_types::chat::{
    ChatMessage, ChatSession, MessageStats, MessageUpdate, ModelUsage, SessionAggregate,
    SessionStats, SessionStatus, SessionsDeleted,
};
use parley_types::error::RepositoryError;
use parley_types::page::PageRequest;
use parley_types::user::UserId;
use uuid::Uuid;

/// Store operation behind the aggregate recalculator.
pub trait AggregateStore: Send + Sync {
    /// Recompute a session's roll-up from its live messages and persist it,
    /// together with `last_message_at = now`, in a single statement.
    ///
    /// Returns `None` when the session is missing or soft-deleted.
    fn recompute_aggregate(
        &self,
        session_id: &Uuid,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Option<SessionAggregate>, RepositoryError>> + Send;
}

/// Repository trait for chat session and message persistence.
///
/// Implementations live in parley-infra (e.g., `SqliteChatRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatRepository: AggregateStore {
    // --- Sessions ---

    /// Insert a new session. `Conflict` if the id is taken.
    fn create_session(
        &self,
        session: &ChatSession,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a live session by id.
    fn get_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatSession>, RepositoryError>> + Send;

    /// Replace the topic of a live session. `NotFound` if no live row matched.
    fn update_session_topic(
        &self,
        session_id: &Uuid,
        topic: &str,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Set the status of a live session. `NotFound` if no live row matched.
    fn set_session_status(
        &self,
        session_id: &Uuid,
        status: SessionStatus,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Soft-delete a session and, in the same transaction, all of its messages.
    ///
    /// Returns the number of messages that were soft-deleted.
    fn delete_session_cascade(
        &self,
        session_id: &Uuid,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Soft-delete every live session of a user and all of their messages
    /// in one transaction.
    fn delete_user_sessions(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<SessionsDeleted, RepositoryError>> + Send;

    /// Live sessions of a user, newest first, plus the total count.
    fn list_sessions(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<(Vec<ChatSession>, u64), RepositoryError>> + Send;

    /// Live sessions whose topic contains `keyword`.
    fn search_sessions(
        &self,
        user_id: UserId,
        keyword: &str,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<(Vec<ChatSession>, u64), RepositoryError>> + Send;

    fn session_stats(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<SessionStats, RepositoryError>> + Send;

    /// Usage per model over live sessions, highest cost first.
    fn model_usage(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Vec<ModelUsage>, RepositoryError>> + Send;

    // --- Messages ---

    /// Insert a new message. `Conflict` if the id is taken.
    fn insert_message(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a live message of a live session.
    fn get_message(
        &self,
        message_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatMessage>, RepositoryError>> + Send;

    /// Write only the fields present in `update` to a live message, in one
    /// statement, and return the stored row. Setting status `normal` clears
    /// the error text. `NotFound` if no live row matched.
    fn update_message(
        &self,
        message_id: &Uuid,
        update: &MessageUpdate,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send;

    /// Soft-delete a live message. `NotFound` if no live row matched.
    fn soft_delete_message(
        &self,
        message_id: &Uuid,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Live messages of a session, oldest first.
    fn list_session_messages(
        &self,
        session_id: &Uuid,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<(Vec<ChatMessage>, u64), RepositoryError>> + Send;

    /// Live messages across a user's live sessions, newest first.
    fn list_user_messages(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<(Vec<ChatMessage>, u64), RepositoryError>> + Send;

    /// Live messages of a user whose content contains `keyword`, newest first.
    fn search_user_messages(
        &self,
        user_id: UserId,
        keyword: &str,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<(Vec<ChatMessage>, u64), RepositoryError>> + Send;

    /// Live messages of a user with status `error`, newest first.
    fn error_messages(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> impl std::future::Future<Output = Result<(Vec<ChatMessage>, u64), RepositoryError>> + Send;

    /// The `limit` newest live messages of a user.
    fn recent_messages(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    fn session_message_stats(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<MessageStats, RepositoryError>> + Send;

    fn user_message_stats(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<MessageStats, RepositoryError>> + Send;
}
