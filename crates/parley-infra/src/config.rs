//! Configuration loader for Parley.
//!
//! Reads `config.toml` from the data directory (`~/.parley/` in production)
//! and deserializes it into [`ParleyConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use parley_types::config::ParleyConfig;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`ParleyConfig::default()`].
/// - If the file cannot be read or parsed, logs a warning and returns the default.
pub async fn load_config(data_dir: &Path) -> ParleyConfig {
    let config_path = data_dir.join(CONFIG_FILE_NAME);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ParleyConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ParleyConfig::default();
        }
    };

    match toml::from_str::<ParleyConfig>(&content) {
        Ok(config) => {
            tracing::debug!("Loaded configuration from {}", config_path.display());
            config
        }
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ParleyConfig::default()
        }
    }
}

/// Shared, swappable configuration.
///
/// Components take an immutable snapshot at construction. A `refresh` only
/// affects snapshots taken after it.
pub struct ConfigHandle {
    data_dir: PathBuf,
    current: RwLock<Arc<ParleyConfig>>,
}

impl ConfigHandle {
    /// Load the configuration found in `data_dir`.
    pub async fn load(data_dir: &Path) -> Self {
        let config = load_config(data_dir).await;
        Self {
            data_dir: data_dir.to_path_buf(),
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Wrap an already-built configuration (tests, embedding).
    pub fn from_config(data_dir: &Path, config: ParleyConfig) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            current: RwLock::new(Arc::new(config)),
        }
    }

    pub fn snapshot(&self) -> Arc<ParleyConfig> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Re-read `config.toml` and swap in the result.
    pub async fn refresh(&self) -> Arc<ParleyConfig> {
        let fresh = Arc::new(load_config(&self.data_dir).await);
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::clone(&fresh);
        fresh
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.pagination.session_page_size, 10);
        assert_eq!(config.subscriptions.max_subscribe_attempts, 3);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"
[database]
busy_timeout_ms = 250

[sessions]
default_model = "claude-haiku"
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.database.busy_timeout_ms, 250);
        assert_eq!(config.database.file_name, "parley.db");
        assert_eq!(config.sessions.default_model, "claude-haiku");
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join(CONFIG_FILE_NAME), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.sessions.default_model, "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn refresh_swaps_snapshot_without_touching_old_ones() {
        let tmp = TempDir::new().unwrap();
        let handle = ConfigHandle::load(tmp.path()).await;
        let before = handle.snapshot();

        tokio::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[subscriptions]\nmax_subscribe_attempts = 7\n",
        )
        .await
        .unwrap();
        let refreshed = handle.refresh().await;

        assert_eq!(before.subscriptions.max_subscribe_attempts, 3);
        assert_eq!(refreshed.subscriptions.max_subscribe_attempts, 7);
        assert_eq!(handle.snapshot().subscriptions.max_subscribe_attempts, 7);
    }
}
