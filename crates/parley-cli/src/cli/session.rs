//! Session CLI commands: create, inspect, rename, end, delete, list, search.
//!
//! Both deletions ask for confirmation unless `--force` or `--json` is given.

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Color};
use console::style;
use dialoguer::Confirm;
use parley_core::chat::aggregate::AggregateOutcome;
use parley_types::chat::{ChatSession, NewSession, SessionStatus};
use parley_types::page::Page;
use parley_types::user::UserId;
use uuid::Uuid;

use super::{
    PageArgs, format_cost, new_table, print_empty, print_page_footer, truncate,
};
use crate::state::AppState;

#[derive(Subcommand)]
pub enum SessionCommand {
    /// Start a new session.
    Create {
        /// Conversation topic.
        topic: String,

        /// Model name (defaults to `[sessions].default_model`).
        #[arg(long)]
        model: Option<String>,

        /// Channel the session belongs to.
        #[arg(long)]
        channel: Option<i64>,
    },

    /// Show one session with its totals.
    Show {
        /// Session id.
        id: Uuid,
    },

    /// Rename a session.
    Topic {
        /// Session id.
        id: Uuid,

        /// New topic.
        topic: String,
    },

    /// Mark a session as ended.
    End {
        /// Session id.
        id: Uuid,
    },

    /// Delete a session and all of its messages.
    #[command(alias = "rm")]
    Delete {
        /// Session id.
        id: Uuid,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Delete every session of the user, with their messages.
    #[command(name = "delete-all", alias = "purge")]
    DeleteAll {
        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// List sessions, newest first.
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Find sessions whose topic contains a keyword.
    Search {
        keyword: String,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Recompute a session's message count, tokens, and cost.
    Recompute {
        /// Session id.
        id: Uuid,
    },

    /// Per-model usage across all sessions.
    Usage,
}

pub async fn handle_session_command(
    cmd: SessionCommand,
    state: &AppState,
    user: UserId,
    json: bool,
) -> Result<()> {
    match cmd {
        SessionCommand::Create {
            topic,
            model,
            channel,
        } => {
            let input = NewSession {
                topic,
                model,
                channel_id: channel,
            };
            let session = state.chat_service.create_session(user, input).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
            } else {
                println!();
                println!(
                    "  {} Created session '{}'",
                    style("ok").green().bold(),
                    style(&session.topic).cyan().bold()
                );
                println!("  id:    {}", style(session.id).dim());
                println!("  model: {}", session.model);
                println!();
            }
        }

        SessionCommand::Show { id } => {
            let session = state.chat_service.get_session(user, &id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
            } else {
                print_session_detail(&session);
            }
        }

        SessionCommand::Topic { id, topic } => {
            let session = state.chat_service.update_topic(user, &id, &topic).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
            } else {
                println!();
                println!(
                    "  {} Topic set to '{}'",
                    style("ok").green().bold(),
                    style(&session.topic).cyan()
                );
                println!();
            }
        }

        SessionCommand::End { id } => {
            let session = state.chat_service.end_session(user, &id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
            } else {
                println!();
                println!(
                    "  {} Session '{}' ended",
                    style("ok").green().bold(),
                    style(&session.topic).cyan()
                );
                println!();
            }
        }

        SessionCommand::Delete { id, force } => delete_session(state, user, id, force, json).await?,

        SessionCommand::DeleteAll { force } => delete_all_sessions(state, user, force, json).await?,

        SessionCommand::List { page } => {
            let sessions = state
                .chat_service
                .list_sessions(user, page.page, page.page_size)
                .await?;
            print_sessions(&sessions, json, "No sessions yet. Start one with: parley session create <TOPIC>")?;
        }

        SessionCommand::Search { keyword, page } => {
            let sessions = state
                .chat_service
                .search_sessions(user, &keyword, page.page, page.page_size)
                .await?;
            let empty = format!("No sessions match '{keyword}'.");
            print_sessions(&sessions, json, &empty)?;
        }

        SessionCommand::Recompute { id } => {
            let outcome = state.chat_service.recompute(user, &id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                return Ok(());
            }
            println!();
            match outcome {
                AggregateOutcome::Fresh(aggregate) => {
                    println!(
                        "  {} {} messages, {} tokens, {}",
                        style("ok").green().bold(),
                        aggregate.message_count,
                        aggregate.token_count,
                        format_cost(aggregate.total_cost)
                    );
                }
                AggregateOutcome::Stale { reason } => {
                    println!(
                        "  {} Totals left unchanged: {}",
                        style("!").yellow().bold(),
                        style(reason).yellow()
                    );
                }
            }
            println!();
        }

        SessionCommand::Usage => {
            let usage = state.chat_service.model_usage(user).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&usage)?);
                return Ok(());
            }
            if usage.is_empty() {
                print_empty("No usage recorded yet.");
                return Ok(());
            }

            let mut table = new_table(&["Model", "Sessions", "Messages", "Tokens", "Cost"]);
            for row in &usage {
                table.add_row(vec![
                    Cell::new(&row.model).fg(Color::Cyan),
                    Cell::new(row.session_count.to_string()),
                    Cell::new(row.message_count.to_string()),
                    Cell::new(row.total_tokens.to_string()),
                    Cell::new(format_cost(row.total_cost)).fg(Color::Yellow),
                ]);
            }
            println!();
            println!("{table}");
            println!();
        }
    }
    Ok(())
}

async fn delete_session(
    state: &AppState,
    user: UserId,
    id: Uuid,
    force: bool,
    json: bool,
) -> Result<()> {
    let session = state.chat_service.get_session(user, &id).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete session '{}' ({} messages)?",
                style(&session.topic).red().bold(),
                session.message_count
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let removed = state.chat_service.delete_session(user, &id).await?;

    if json {
        let out = serde_json::json!({
            "session_id": id,
            "deleted": true,
            "messages_removed": removed,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!(
            "  {} Deleted session '{}' and {} message{}",
            style("ok").green().bold(),
            style(&session.topic).cyan(),
            removed,
            if removed == 1 { "" } else { "s" }
        );
        println!();
    }
    Ok(())
}

async fn delete_all_sessions(state: &AppState, user: UserId, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete {} of user {user}?",
                style("all sessions").red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let deleted = state.chat_service.delete_all_sessions(user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&deleted)?);
    } else {
        println!();
        println!(
            "  {} Deleted {} session{} and {} message{}",
            style("ok").green().bold(),
            deleted.sessions,
            if deleted.sessions == 1 { "" } else { "s" },
            deleted.messages,
            if deleted.messages == 1 { "" } else { "s" }
        );
        println!();
    }
    Ok(())
}

fn status_cell(status: SessionStatus) -> Cell {
    match status {
        SessionStatus::Active => Cell::new("active").fg(Color::Green),
        SessionStatus::Ended => Cell::new("ended").fg(Color::DarkGrey),
        SessionStatus::Deleted => Cell::new("deleted").fg(Color::Red),
    }
}

fn print_sessions(sessions: &Page<ChatSession>, json: bool, empty: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(sessions)?);
        return Ok(());
    }
    if sessions.items.is_empty() {
        print_empty(empty);
        return Ok(());
    }

    let mut table = new_table(&["Id", "Topic", "Model", "Messages", "Tokens", "Cost", "Status", "Created"]);
    for session in &sessions.items {
        table.add_row(vec![
            Cell::new(session.id.to_string()).fg(Color::DarkGrey),
            Cell::new(truncate(&session.topic, 40)).fg(Color::Cyan),
            Cell::new(&session.model),
            Cell::new(session.message_count.to_string()),
            Cell::new(session.token_count.to_string()),
            Cell::new(format_cost(session.total_cost)).fg(Color::Yellow),
            status_cell(session.status),
            Cell::new(session.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }

    println!();
    println!("{table}");
    print_page_footer(sessions, "session");
    Ok(())
}

fn print_session_detail(session: &ChatSession) {
    let last = session
        .last_message_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    println!();
    println!("  {}", style(&session.topic).cyan().bold());
    println!();
    println!("  id:           {}", session.id);
    println!("  status:       {}", session.status);
    println!("  model:        {}", session.model);
    println!("  channel:      {}", session.channel_id);
    println!("  messages:     {}", session.message_count);
    println!("  tokens:       {}", session.token_count);
    println!("  cost:         {}", format_cost(session.total_cost));
    println!("  created:      {}", session.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  last message: {last}");
    println!();
}
