//! Business logic and repository trait definitions for Parley.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements, plus the services built on them: the session aggregate
//! recalculator, the session/message lifecycle service, and the subscription
//! reconciler. It depends only on `parley-types` -- never on `parley-infra`
//! or any database/IO crate.

pub mod chat;
pub mod ownership;
pub mod subscription;
pub mod validate;
