//! Usage overview across sessions, messages, and subscriptions.

use anyhow::Result;
use console::style;
use parley_types::user::UserId;

use super::format_cost;
use crate::state::AppState;

pub async fn show_stats(state: &AppState, user: UserId, json: bool) -> Result<()> {
    let sessions = state.chat_service.session_stats(user).await?;
    let messages = state.chat_service.user_message_stats(user).await?;
    let subscriptions = state.reconciler.list_for_user(user, Some(1), Some(1)).await?;

    if json {
        let out = serde_json::json!({
            "user_id": user,
            "sessions": sessions,
            "messages": messages,
            "subscriptions": subscriptions.total,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  {} user {}", style("Parley").cyan().bold(), style(user).bold());
    println!();
    println!(
        "  Sessions:      {} ({} active)",
        sessions.total_sessions, sessions.active_sessions
    );
    println!(
        "  Messages:      {} (user {}, assistant {}, system {})",
        messages.total_messages,
        messages.user_messages,
        messages.assistant_messages,
        messages.system_messages
    );
    println!("  Tokens:        {}", sessions.total_tokens);
    println!("  Cost:          {}", format_cost(sessions.total_cost));
    println!(
        "  Avg/session:   {:.1} messages",
        sessions.avg_messages_per_session
    );
    println!("  Subscriptions: {}", subscriptions.total);
    println!();
    Ok(())
}
