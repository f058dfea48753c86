//! Configuration CLI commands.

use anyhow::Result;
use clap::Subcommand;
use console::style;

use crate::state::AppState;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration, re-read from disk.
    Show,

    /// Print the data directory and configuration file paths.
    Path,
}

pub async fn handle_config_command(cmd: ConfigCommand, state: &AppState, json: bool) -> Result<()> {
    let path = state.config.config_path();
    match cmd {
        ConfigCommand::Show => {
            let config = state.config.refresh().await;
            if json {
                let out = serde_json::json!({
                    "path": path.display().to_string(),
                    "exists": tokio::fs::try_exists(&path).await.unwrap_or(false),
                    "config": &*config,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!();
                println!("  {} {}", style("#").dim(), style(path.display()).dim());
                println!();
                print!("{}", toml::to_string_pretty(&*config)?);
                println!();
            }
        }

        ConfigCommand::Path => {
            if json {
                let out = serde_json::json!({
                    "data_dir": state.data_dir.display().to_string(),
                    "config": path.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("data dir: {}", state.data_dir.display());
                println!("config:   {}", path.display());
            }
        }
    }
    Ok(())
}
