//! Chat sessions and messages.
//!
//! `ChatRepository` is the persistence port, `AggregateRecalculator` keeps the
//! session roll-up in sync with live messages, and `ChatService` enforces
//! ownership around every read and mutation.

pub mod aggregate;
pub mod repository;
pub mod service;
