//! Message CLI commands.
//!
//! Every mutation recomputes the owning session's totals. A failed recompute
//! does not fail the command; it prints a warning instead.

use anyhow::{Result, bail};
use clap::Subcommand;
use comfy_table::{Cell, Color};
use console::style;
use dialoguer::Confirm;
use parley_types::chat::{
    ChatMessage, MessageRole, MessageStats, MessageStatus, MessageUpdate, NewMessage,
};
use parley_types::page::Page;
use parley_types::user::UserId;
use uuid::Uuid;

use super::{
    PageArgs, format_cost, new_table, print_empty, print_page_footer, print_recompute_warning,
    truncate,
};
use crate::state::AppState;

#[derive(Subcommand)]
pub enum MessageCommand {
    /// Append a message to a session.
    Add {
        /// Session id.
        session: Uuid,

        /// Message text.
        content: String,

        /// Author role: system, user, or assistant.
        #[arg(long, default_value = "user")]
        role: MessageRole,

        /// Token count charged for the message.
        #[arg(long, default_value_t = 0)]
        tokens: u32,

        /// Cost of the message.
        #[arg(long, default_value_t = 0.0)]
        cost: f64,

        /// Record the message as failed with this error text.
        #[arg(long)]
        error: Option<String>,
    },

    /// Show one message.
    Show {
        /// Message id.
        id: Uuid,
    },

    /// Change fields of a message.
    Edit {
        /// Message id.
        id: Uuid,

        #[arg(long)]
        content: Option<String>,

        #[arg(long)]
        tokens: Option<u32>,

        #[arg(long)]
        cost: Option<f64>,

        /// normal or error.
        #[arg(long)]
        status: Option<MessageStatus>,

        #[arg(long)]
        error: Option<String>,
    },

    /// Delete a message.
    #[command(alias = "rm")]
    Delete {
        /// Message id.
        id: Uuid,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// List the messages of one session, oldest first.
    #[command(alias = "ls")]
    List {
        /// Session id.
        session: Uuid,

        #[command(flatten)]
        page: PageArgs,
    },

    /// List messages across all sessions, newest first.
    All {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Find messages whose content contains a keyword.
    Search {
        keyword: String,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Most recent messages across all sessions.
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Messages recorded as failed.
    Errors {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Message statistics, for one session or all of them.
    Stats {
        /// Restrict to this session.
        #[arg(long)]
        session: Option<Uuid>,
    },
}

pub async fn handle_message_command(
    cmd: MessageCommand,
    state: &AppState,
    user: UserId,
    json: bool,
) -> Result<()> {
    let chat = &state.chat_service;
    match cmd {
        MessageCommand::Add {
            session,
            content,
            role,
            tokens,
            cost,
            error,
        } => {
            let mut input = NewMessage::new(role, content, tokens, cost);
            if let Some(error) = error {
                input.status = MessageStatus::Error;
                input.error_msg = Some(error);
            }
            let result = chat.create_message(user, &session, input).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!();
                println!(
                    "  {} Added {} message {}",
                    style("ok").green().bold(),
                    result.value.role,
                    style(result.value.id).dim()
                );
                println!();
                print_recompute_warning(&result);
            }
        }

        MessageCommand::Show { id } => {
            let message = chat.get_message(user, &id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&message)?);
            } else {
                print_message_detail(&message);
            }
        }

        MessageCommand::Edit {
            id,
            content,
            tokens,
            cost,
            status,
            error,
        } => {
            let update = MessageUpdate {
                content,
                tokens,
                cost,
                status,
                error_msg: error,
            };
            if update.is_empty() {
                bail!("nothing to change: pass at least one of --content, --tokens, --cost, --status, --error");
            }
            let result = chat.update_message(user, &id, update).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!();
                println!(
                    "  {} Updated message {}",
                    style("ok").green().bold(),
                    style(result.value.id).dim()
                );
                println!();
                print_recompute_warning(&result);
            }
        }

        MessageCommand::Delete { id, force } => {
            let message = chat.get_message(user, &id).await?;

            if !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!(
                        "Delete {} message '{}'?",
                        message.role,
                        style(truncate(&message.content, 40)).red().bold()
                    ))
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("  Cancelled.");
                    return Ok(());
                }
            }

            let result = chat.delete_message(user, &id).await?;
            if json {
                let out = serde_json::json!({
                    "message_id": id,
                    "session_id": result.value,
                    "deleted": true,
                    "aggregate": result.aggregate,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!();
                println!("  {} Deleted message {}", style("ok").green().bold(), style(id).dim());
                println!();
                print_recompute_warning(&result);
            }
        }

        MessageCommand::List { session, page } => {
            let messages = chat
                .list_messages(user, &session, page.page, page.page_size)
                .await?;
            print_messages(&messages, json, "This session has no messages.")?;
        }

        MessageCommand::All { page } => {
            let messages = chat.list_user_messages(user, page.page, page.page_size).await?;
            print_messages(&messages, json, "No messages yet.")?;
        }

        MessageCommand::Search { keyword, page } => {
            let messages = chat
                .search_messages(user, &keyword, page.page, page.page_size)
                .await?;
            let empty = format!("No messages match '{keyword}'.");
            print_messages(&messages, json, &empty)?;
        }

        MessageCommand::Recent { limit } => {
            let messages = chat.recent_messages(user, limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else if messages.is_empty() {
                print_empty("No messages yet.");
            } else {
                println!();
                println!("{}", message_table(&messages));
                println!();
            }
        }

        MessageCommand::Errors { page } => {
            let messages = chat.error_messages(user, page.page, page.page_size).await?;
            print_messages(&messages, json, "No failed messages.")?;
        }

        MessageCommand::Stats { session } => {
            let stats = match session {
                Some(session) => chat.session_message_stats(user, &session).await?,
                None => chat.user_message_stats(user).await?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_message_stats(&stats);
            }
        }
    }
    Ok(())
}

fn message_table(messages: &[ChatMessage]) -> comfy_table::Table {
    let mut table = new_table(&["Id", "Role", "Content", "Tokens", "Cost", "Status", "Created"]);
    for message in messages {
        let role_color = match message.role {
            MessageRole::User => Color::Cyan,
            MessageRole::Assistant => Color::Green,
            MessageRole::System => Color::Magenta,
        };
        let status = match message.status {
            MessageStatus::Normal => Cell::new("normal").fg(Color::DarkGrey),
            MessageStatus::Error => Cell::new("error").fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(message.id.to_string()).fg(Color::DarkGrey),
            Cell::new(message.role.to_string()).fg(role_color),
            Cell::new(truncate(&message.content, 50)),
            Cell::new(message.tokens.to_string()),
            Cell::new(format_cost(message.cost)).fg(Color::Yellow),
            status,
            Cell::new(message.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }
    table
}

fn print_messages(messages: &Page<ChatMessage>, json: bool, empty: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(messages)?);
        return Ok(());
    }
    if messages.items.is_empty() {
        print_empty(empty);
        return Ok(());
    }
    println!();
    println!("{}", message_table(&messages.items));
    print_page_footer(messages, "message");
    Ok(())
}

fn print_message_detail(message: &ChatMessage) {
    println!();
    println!("  {} {}", style(message.role).bold(), style(message.id).dim());
    println!("  session: {}", message.session_id);
    println!(
        "  tokens:  {}   cost: {}",
        message.tokens,
        format_cost(message.cost)
    );
    println!("  status:  {}", message.status);
    if let Some(error) = &message.error_msg {
        println!("  error:   {}", style(error).red());
    }
    println!("  created: {}", message.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!();
    for line in message.content.lines() {
        println!("  {line}");
    }
    println!();
}

fn print_message_stats(stats: &MessageStats) {
    println!();
    println!("  {}", style("Message statistics").bold());
    println!();
    println!("  total:      {}", stats.total_messages);
    println!("  user:       {}", stats.user_messages);
    println!("  assistant:  {}", stats.assistant_messages);
    println!("  system:     {}", stats.system_messages);
    println!("  tokens:     {}", stats.total_tokens);
    println!("  cost:       {}", format_cost(stats.total_cost));
    println!("  avg tokens: {:.1}", stats.avg_tokens_per_message);
    println!();
}
