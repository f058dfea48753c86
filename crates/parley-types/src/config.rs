//! Configuration types for Parley.
//!
//! `ParleyConfig` mirrors `config.toml` in the data directory. Every field
//! has a default, so an empty or missing file yields a working setup.

use serde::{Deserialize, Serialize};

use crate::page::PageRequest;

/// Top-level configuration.
///
/// Loaded once per process and handed to services as an immutable snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub subscriptions: SubscriptionConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// SQLite connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file name inside the data directory.
    #[serde(default = "default_db_file_name")]
    pub file_name: String,
    /// Connections in the read-only pool.
    #[serde(default = "default_max_readers")]
    pub max_readers: u32,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_file_name() -> String {
    "parley.db".to_string()
}

fn default_max_readers() -> u32 {
    8
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            file_name: default_db_file_name(),
            max_readers: default_max_readers(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// Default page sizes per resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_session_page_size")]
    pub session_page_size: u32,
    #[serde(default = "default_message_page_size")]
    pub message_page_size: u32,
    #[serde(default = "default_subscription_page_size")]
    pub subscription_page_size: u32,
    #[serde(default = "default_article_page_size")]
    pub article_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_session_page_size() -> u32 {
    10
}

fn default_message_page_size() -> u32 {
    20
}

fn default_subscription_page_size() -> u32 {
    10
}

fn default_article_page_size() -> u32 {
    10
}

fn default_max_page_size() -> u32 {
    100
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            session_page_size: default_session_page_size(),
            message_page_size: default_message_page_size(),
            subscription_page_size: default_subscription_page_size(),
            article_page_size: default_article_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl PaginationConfig {
    pub fn sessions(&self, page: Option<u32>, page_size: Option<u32>) -> PageRequest {
        PageRequest::resolve(page, page_size, self.session_page_size, self.max_page_size)
    }

    pub fn messages(&self, page: Option<u32>, page_size: Option<u32>) -> PageRequest {
        PageRequest::resolve(page, page_size, self.message_page_size, self.max_page_size)
    }

    pub fn subscriptions(&self, page: Option<u32>, page_size: Option<u32>) -> PageRequest {
        PageRequest::resolve(
            page,
            page_size,
            self.subscription_page_size,
            self.max_page_size,
        )
    }

    pub fn articles(&self, page: Option<u32>, page_size: Option<u32>) -> PageRequest {
        PageRequest::resolve(page, page_size, self.article_page_size, self.max_page_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Model recorded on sessions created without one.
    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Attempts a subscribe call makes before a lost race surfaces as a conflict.
    #[serde(default = "default_max_subscribe_attempts")]
    pub max_subscribe_attempts: u32,
}

fn default_max_subscribe_attempts() -> u32 {
    3
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            max_subscribe_attempts: default_max_subscribe_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

fn default_max_message_chars() -> usize {
    100_000
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Bridge tracing spans to OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub otel: bool,
}
