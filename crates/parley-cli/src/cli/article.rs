//! Article CLI commands (administrative, no user required).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use console::style;
use parley_types::subscription::NewArticle;

use crate::state::AppState;

#[derive(Subcommand)]
pub enum ArticleCommand {
    /// Add an article to a subscription.
    Add {
        /// Subscription id.
        subscription: i64,

        /// Article title.
        title: String,

        #[arg(long, default_value = "")]
        summary: String,

        /// Full text, or `@path` to read it from a file.
        #[arg(long, default_value = "")]
        content: String,

        #[arg(long, default_value = "")]
        author: String,

        /// Publication time (RFC 3339).
        #[arg(long)]
        published: Option<DateTime<Utc>>,

        #[arg(long, default_value = "")]
        url: String,

        #[arg(long, default_value = "")]
        key_points: String,

        #[arg(long, default_value = "")]
        journal: String,

        #[arg(long, default_value_t = 0)]
        citations: u32,

        /// Rating from 0 to 10.
        #[arg(long, default_value_t = 0.0)]
        rating: f64,
    },

    /// Delete an article.
    #[command(alias = "rm")]
    Delete {
        /// Article id.
        id: i64,
    },
}

pub async fn handle_article_command(
    cmd: ArticleCommand,
    state: &AppState,
    json: bool,
) -> Result<()> {
    match cmd {
        ArticleCommand::Add {
            subscription,
            title,
            summary,
            content,
            author,
            published,
            url,
            key_points,
            journal,
            citations,
            rating,
        } => {
            let content = read_inline_or_file(content).await?;
            let input = NewArticle {
                title,
                summary,
                content,
                author,
                published_at: published,
                url,
                key_points,
                journal_name: journal,
                citation_count: citations,
                rating,
            };
            let article = state.reconciler.create_article(subscription, input).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&article)?);
            } else {
                println!();
                println!(
                    "  {} Added article '{}' (id {})",
                    style("ok").green().bold(),
                    style(&article.title).cyan().bold(),
                    article.id
                );
                println!();
            }
        }

        ArticleCommand::Delete { id } => {
            state.reconciler.delete_article(id).await?;
            if json {
                let out = serde_json::json!({ "article_id": id, "deleted": true });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!();
                println!("  {} Deleted article {id}", style("ok").green().bold());
                println!();
            }
        }
    }
    Ok(())
}

/// `@path` reads the file; anything else is used as-is.
async fn read_inline_or_file(value: String) -> Result<String> {
    match value.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read article content from {path}")),
        None => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inline_content_passes_through() {
        assert_eq!(read_inline_or_file("plain".into()).await.unwrap(), "plain");
    }

    #[tokio::test]
    async fn test_at_prefix_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.txt");
        tokio::fs::write(&path, "from disk").await.unwrap();

        let value = format!("@{}", path.display());
        assert_eq!(read_inline_or_file(value).await.unwrap(), "from disk");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        assert!(read_inline_or_file("@/nonexistent/parley/body.txt".into()).await.is_err());
    }
}
