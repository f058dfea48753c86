//! Shared domain types for Parley.
//!
//! Sessions, messages, subscriptions, articles, pagination, configuration,
//! and the error types shared by the core and infrastructure layers.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod page;
pub mod record;
pub mod subscription;
pub mod user;
