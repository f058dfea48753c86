//! CLI command definitions and dispatch for the `parley` binary.
//!
//! Uses clap derive macros for argument parsing. Commands are grouped by
//! noun (`parley session create`, `parley sub list`), each group living in
//! its own module with a `handle_*_command` entry point.

pub mod article;
pub mod config;
pub mod message;
pub mod session;
pub mod stats;
pub mod subscription;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use parley_core::chat::aggregate::Recomputed;
use parley_types::page::Page;
use parley_types::user::UserId;

/// Administer chat sessions, messages, and topic subscriptions.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Act as this user id.
    #[arg(long, short = 'u', global = true, env = "PARLEY_USER")]
    pub user: Option<UserId>,

    #[command(subcommand)]
    pub command: Commands,
}

/// The acting user, required by every user-scoped command.
pub fn require_user(user: Option<UserId>) -> Result<UserId> {
    match user {
        Some(user) => Ok(user),
        None => bail!("this command needs a user: pass --user <ID> or set PARLEY_USER"),
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage chat sessions.
    #[command(alias = "sessions")]
    Session {
        #[command(subcommand)]
        action: session::SessionCommand,
    },

    /// Manage chat messages.
    #[command(alias = "msg")]
    Message {
        #[command(subcommand)]
        action: message::MessageCommand,
    },

    /// Manage topic subscriptions.
    #[command(alias = "subscription")]
    Sub {
        #[command(subcommand)]
        action: subscription::SubCommand,
    },

    /// Manage subscription articles (administrative).
    Article {
        #[command(subcommand)]
        action: article::ArticleCommand,
    },

    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: config::ConfigCommand,
    },

    /// Usage overview for the acting user.
    Stats,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Pagination flags shared by list commands.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct PageArgs {
    /// Page number, starting at 1.
    #[arg(long)]
    pub page: Option<u32>,

    /// Items per page (1-100; out-of-range values use the default).
    #[arg(long)]
    pub page_size: Option<u32>,
}

/// Styled table with the project-wide look.
pub(crate) fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(*h).fg(Color::White))
            .collect::<Vec<_>>(),
    );
    table
}

/// Shorten `text` to at most `max` characters, marking the cut with `...`.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{keep}...")
}

pub(crate) fn format_cost(cost: f64) -> String {
    format!("${cost:.4}")
}

/// Footer line under a paged table.
pub(crate) fn print_page_footer<T>(page: &Page<T>, noun: &str) {
    println!();
    println!(
        "  {} {noun}{} total, page {} of {}",
        style(page.total).bold(),
        if page.total == 1 { "" } else { "s" },
        page.page,
        page.total_pages().max(1)
    );
    println!();
}

/// Surface a stale roll-up after a committed message mutation.
pub(crate) fn print_recompute_warning<T>(result: &Recomputed<T>) {
    if let Some(reason) = result.warning() {
        println!(
            "  {} Session totals could not be refreshed: {}",
            style("!").yellow().bold(),
            style(reason).yellow()
        );
        println!();
    }
}

pub(crate) fn print_empty(message: &str) {
    println!();
    println!("  {} {message}", style("i").blue().bold());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_user_flag_parses() {
        let cli = Cli::try_parse_from(["parley", "--user", "7", "stats"]).unwrap();
        assert_eq!(require_user(cli.user).unwrap(), UserId(7));
    }

    #[test]
    fn test_require_user_rejects_missing() {
        assert!(require_user(None).is_err());
    }

    #[test]
    fn test_page_args_parse() {
        let cli = Cli::try_parse_from([
            "parley", "session", "list", "--page", "2", "--page-size", "50",
        ])
        .unwrap();
        match cli.command {
            Commands::Session {
                action: session::SessionCommand::List { page },
            } => {
                assert_eq!(page.page, Some(2));
                assert_eq!(page.page_size, Some(50));
            }
            _ => panic!("expected session list"),
        }
    }

    #[test]
    fn test_session_delete_all_parses() {
        for verb in ["delete-all", "purge"] {
            let cli = Cli::try_parse_from(["parley", "session", verb, "--force"]).unwrap();
            assert!(matches!(
                cli.command,
                Commands::Session {
                    action: session::SessionCommand::DeleteAll { force: true },
                }
            ));
        }
    }
}
