//! Data directory layout for Parley.
//!
//! ```text
//! {data_dir}/
//!   config.toml
//!   parley.db      (name from [database].file_name)
//! ```

use std::path::{Path, PathBuf};

use parley_types::config::DatabaseConfig;

pub const DATA_DIR_ENV: &str = "PARLEY_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `PARLEY_DATA_DIR` environment variable
/// 2. `~/.parley`
/// 3. `./.parley`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".parley");
    }

    PathBuf::from(".parley")
}

/// Create the data directory if it does not exist yet.
pub async fn ensure_data_dir(data_dir: &Path) -> Result<(), std::io::Error> {
    tokio::fs::create_dir_all(data_dir).await
}

/// SQLite URL for the database file inside `data_dir`.
pub fn database_url(data_dir: &Path, database: &DatabaseConfig) -> String {
    format!(
        "sqlite://{}?mode=rwc",
        data_dir.join(&database.file_name).display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_database_url() {
        let url = database_url(Path::new("/home/user/.parley"), &DatabaseConfig::default());
        assert_eq!(url, "sqlite:///home/user/.parley/parley.db?mode=rwc");
    }

    #[tokio::test]
    async fn test_ensure_data_dir_creates_nested() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_data_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        // Second call is a no-op.
        ensure_data_dir(&nested).await.unwrap();
    }

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var(DATA_DIR_ENV, "/tmp/test-parley");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-parley"));
        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
        }
    }
}
