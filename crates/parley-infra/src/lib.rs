//! Infrastructure layer for Parley.
//!
//! Contains implementations of the repository traits defined in `parley-core`:
//! SQLite storage with split reader/writer pools, the `config.toml` loader, and
//! data directory resolution.

pub mod config;
pub mod filesystem;
pub mod sqlite;
