//! Topic subscriptions and their membership links.
//!
//! `state` holds the membership state machine, `repository` the persistence
//! port, and `reconciler` drives transitions against the store, including the
//! retry that lets a subscriber who lost a first-subscribe race join the winner.

pub mod reconciler;
pub mod repository;
pub mod state;
