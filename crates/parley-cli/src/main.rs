//! Parley administrative CLI entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, loads configuration, initializes the database and
//! services, then dispatches to the command handler.

mod cli;
mod state;

use std::sync::Arc;

use clap::Parser;
use clap_complete::generate;
use parley_infra::config::ConfigHandle;
use parley_infra::filesystem::resolve_data_dir;
use parley_observe::tracing_setup::{
    filter_for_verbosity, init_tracing, otel_requested, shutdown_tracing,
};

use cli::{Cli, Commands, require_user};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need config, tracing, or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "parley", &mut std::io::stdout());
        return Ok(());
    }

    let data_dir = resolve_data_dir();
    let config = Arc::new(ConfigHandle::load(&data_dir).await);

    init_tracing(
        filter_for_verbosity(cli.verbose, cli.quiet),
        otel_requested(config.snapshot().telemetry.otel),
    )
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    tracing::debug!(
        data_dir = %data_dir.display(),
        config = ?config.snapshot(),
        "Configuration resolved"
    );

    let state = AppState::init(data_dir, config).await?;
    let result = run(cli, &state).await;

    shutdown_tracing();
    result
}

async fn run(cli: Cli, state: &AppState) -> anyhow::Result<()> {
    let json = cli.json;
    let user = cli.user;

    match cli.command {
        Commands::Session { action } => {
            cli::session::handle_session_command(action, state, require_user(user)?, json).await
        }
        Commands::Message { action } => {
            cli::message::handle_message_command(action, state, require_user(user)?, json).await
        }
        Commands::Sub { action } => {
            cli::subscription::handle_sub_command(action, state, user, json).await
        }
        Commands::Article { action } => {
            cli::article::handle_article_command(action, state, json).await
        }
        Commands::Config { action } => {
            cli::config::handle_config_command(action, state, json).await
        }
        Commands::Stats => cli::stats::show_stats(state, require_user(user)?, json).await,
        // Handled before state initialization
        Commands::Completions { .. } => Ok(()),
    }
}
