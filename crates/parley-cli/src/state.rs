//! Application state wiring all services together.
//!
//! Services are generic over repository traits; AppState pins them to the
//! SQLite implementations from parley-infra.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use parley_core::chat::service::ChatService;
use parley_core::subscription::reconciler::SubscriptionReconciler;
use parley_infra::config::ConfigHandle;
use parley_infra::filesystem::{database_url, ensure_data_dir};
use parley_infra::sqlite::chat::SqliteChatRepository;
use parley_infra::sqlite::pool::DatabasePool;
use parley_infra::sqlite::subscription::SqliteSubscriptionRepository;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteChatService = ChatService<SqliteChatRepository>;

pub type ConcreteReconciler = SubscriptionReconciler<SqliteSubscriptionRepository>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub reconciler: Arc<ConcreteReconciler>,
    pub config: Arc<ConfigHandle>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Connect to the database and wire services from a config snapshot.
    pub async fn init(data_dir: PathBuf, config: Arc<ConfigHandle>) -> anyhow::Result<Self> {
        ensure_data_dir(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let snapshot = config.snapshot();
        let db_url = database_url(&data_dir, &snapshot.database);
        let db_pool = DatabasePool::with_config(&db_url, &snapshot.database)
            .await
            .with_context(|| format!("Failed to open database {db_url}"))?;

        let chat_service = ChatService::new(
            SqliteChatRepository::new(db_pool.clone()),
            Arc::clone(&snapshot),
        );
        let reconciler = SubscriptionReconciler::new(
            SqliteSubscriptionRepository::new(db_pool),
            snapshot,
        );

        tracing::debug!(data_dir = %data_dir.display(), "Application state initialized");

        Ok(Self {
            chat_service: Arc::new(chat_service),
            reconciler: Arc::new(reconciler),
            config,
            data_dir,
        })
    }
}
