//! Subscription CLI commands: subscribe, cancel, reactivate, list, articles.

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Color};
use console::style;
use dialoguer::Confirm;
use parley_types::page::Page;
use parley_types::subscription::{Article, MembershipChange, SubscribeOutcome};
use parley_types::user::UserId;

use super::{PageArgs, new_table, print_empty, print_page_footer, require_user, truncate};
use crate::state::AppState;

#[derive(Subcommand)]
pub enum SubCommand {
    /// Subscribe to a topic, creating it if nobody has yet.
    Subscribe {
        /// Topic name.
        topic: String,

        /// Description used when the topic is created.
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Cancel a membership.
    Cancel {
        /// Subscription id.
        id: i64,
    },

    /// Reactivate a cancelled membership.
    Reactivate {
        /// Subscription id.
        id: i64,
    },

    /// Replace a subscription's description (creator only).
    Describe {
        /// Subscription id.
        id: i64,

        /// New description.
        description: String,
    },

    /// Delete a subscription for every member (administrative).
    #[command(alias = "rm")]
    Delete {
        /// Subscription id.
        id: i64,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// List active memberships.
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        page: PageArgs,
    },

    /// List articles of one subscription, or of all memberships.
    Articles {
        /// Subscription id; omit for every active membership.
        id: Option<i64>,

        #[command(flatten)]
        page: PageArgs,
    },
}

pub async fn handle_sub_command(
    cmd: SubCommand,
    state: &AppState,
    user: Option<UserId>,
    json: bool,
) -> Result<()> {
    let reconciler = &state.reconciler;

    match cmd {
        SubCommand::Subscribe { topic, description } => {
            let result = reconciler
                .subscribe(require_user(user)?, &topic, &description)
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }
            let verb = match result.outcome {
                SubscribeOutcome::Created => "Created and subscribed to",
                SubscribeOutcome::Joined => "Subscribed to",
                SubscribeOutcome::AlreadyActive => "Already subscribed to",
                SubscribeOutcome::Reactivated => "Resubscribed to",
            };
            println!();
            println!(
                "  {} {verb} '{}' (id {})",
                style("ok").green().bold(),
                style(&topic).cyan().bold(),
                result.subscription_id
            );
            println!();
        }

        SubCommand::Cancel { id } => {
            let change = reconciler.cancel(require_user(user)?, id).await?;
            print_change(&change, json, "Cancelled", "Already cancelled")?;
        }

        SubCommand::Reactivate { id } => {
            let change = reconciler.reactivate(require_user(user)?, id).await?;
            print_change(&change, json, "Reactivated", "Already active")?;
        }

        SubCommand::Describe { id, description } => {
            let subscription = reconciler
                .update_description(require_user(user)?, id, &description)
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&subscription)?);
            } else {
                println!();
                println!(
                    "  {} Description of '{}' updated",
                    style("ok").green().bold(),
                    style(&subscription.topic_name).cyan()
                );
                println!();
            }
        }

        SubCommand::Delete { id, force } => {
            if !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!(
                        "Delete subscription {} for all of its members?",
                        style(id).red().bold()
                    ))
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("  Cancelled.");
                    return Ok(());
                }
            }

            let subscription = reconciler.delete(id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&subscription)?);
            } else {
                println!();
                println!(
                    "  {} Deleted subscription '{}'",
                    style("ok").green().bold(),
                    style(&subscription.topic_name).cyan()
                );
                println!();
            }
        }

        SubCommand::List { page } => {
            let views = reconciler
                .list_for_user(require_user(user)?, page.page, page.page_size)
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
                return Ok(());
            }
            if views.items.is_empty() {
                print_empty("No active subscriptions. Subscribe with: parley sub subscribe <TOPIC>");
                return Ok(());
            }

            let mut table = new_table(&["Id", "Topic", "Description", "Articles", "Since"]);
            for view in &views.items {
                table.add_row(vec![
                    Cell::new(view.subscription.id.to_string()).fg(Color::DarkGrey),
                    Cell::new(&view.subscription.topic_name).fg(Color::Cyan),
                    Cell::new(truncate(&view.subscription.description, 40)),
                    Cell::new(view.article_count.to_string()),
                    Cell::new(view.link.created_at.format("%Y-%m-%d").to_string()),
                ]);
            }
            println!();
            println!("{table}");
            print_page_footer(&views, "subscription");
        }

        SubCommand::Articles { id, page } => {
            let user = require_user(user)?;
            let articles = match id {
                Some(id) => {
                    reconciler
                        .list_articles(user, id, page.page, page.page_size)
                        .await?
                }
                None => {
                    reconciler
                        .list_all_articles_for_user(user, page.page, page.page_size)
                        .await?
                }
            };
            print_articles(&articles, json)?;
        }
    }
    Ok(())
}

fn print_change(change: &MembershipChange, json: bool, done: &str, noop: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(change)?);
        return Ok(());
    }
    println!();
    if change.changed() {
        println!(
            "  {} {done} membership in subscription {}",
            style("ok").green().bold(),
            change.subscription_id
        );
    } else {
        println!(
            "  {} {noop}: subscription {}",
            style("i").blue().bold(),
            change.subscription_id
        );
    }
    println!();
    Ok(())
}

fn print_articles(articles: &Page<Article>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(articles)?);
        return Ok(());
    }
    if articles.items.is_empty() {
        print_empty("No articles.");
        return Ok(());
    }

    let mut table = new_table(&["Id", "Title", "Author", "Journal", "Published", "Rating"]);
    for article in &articles.items {
        let published = article
            .published_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(article.id.to_string()).fg(Color::DarkGrey),
            Cell::new(truncate(&article.title, 50)).fg(Color::Cyan),
            Cell::new(truncate(&article.author, 24)),
            Cell::new(truncate(&article.journal_name, 24)),
            Cell::new(published),
            Cell::new(format!("{:.1}", article.rating)).fg(Color::Yellow),
        ]);
    }
    println!();
    println!("{table}");
    print_page_footer(articles, "article");
    Ok(())
}
