//! Live-row predicates, one builder per entity.
//!
//! Every read of sessions, messages, memberships, or articles starts from one
//! of these builders, so the soft-delete filter is written exactly once. The
//! builder is returned open (after the `WHERE` clause) for ordering and paging.

use parley_types::chat::SessionStatus;
use parley_types::page::PageRequest;
use parley_types::record::RecordState;
use parley_types::subscription::{LinkStatus, SubscriptionStatus};
use parley_types::user::UserId;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

/// Which live sessions a query selects.
pub(crate) enum SessionScope {
    User(UserId),
    /// Sessions of a user whose topic contains the keyword.
    UserTopic(UserId, String),
}

/// Which live messages a query selects.
///
/// A message is live when its own state is `live` and its session is not
/// deleted.
pub(crate) enum MessageScope {
    Id(Uuid),
    Session(Uuid),
    User(UserId),
    /// Messages of a user whose content contains the keyword.
    UserContent(UserId, String),
    UserErrors(UserId),
}

/// Which live articles a query selects.
pub(crate) enum ArticleScope {
    Subscription(i64),
    /// Articles of every subscription the user effectively belongs to.
    User(UserId),
}

/// `SELECT {columns} FROM chat_sessions s WHERE <live> AND <scope>`.
pub(crate) fn sessions(columns: &str, scope: &SessionScope) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {columns} FROM chat_sessions s WHERE s.status != "
    ));
    qb.push_bind(SessionStatus::Deleted.to_string());
    match scope {
        SessionScope::User(user) => {
            qb.push(" AND s.user_id = ").push_bind(user.0);
        }
        SessionScope::UserTopic(user, keyword) => {
            qb.push(" AND s.user_id = ").push_bind(user.0);
            qb.push(" AND s.topic LIKE ")
                .push_bind(like_pattern(keyword))
                .push(" ESCAPE '\\'");
        }
    }
    qb
}

/// `SELECT {columns} FROM chat_messages m JOIN chat_sessions s WHERE <live> AND <scope>`.
pub(crate) fn messages(columns: &str, scope: &MessageScope) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {columns} FROM chat_messages m \
         JOIN chat_sessions s ON s.session_id = m.session_id \
         WHERE m.state = "
    ));
    qb.push_bind(RecordState::Live.to_string())
        .push(" AND s.status != ")
        .push_bind(SessionStatus::Deleted.to_string());
    match scope {
        MessageScope::Id(id) => {
            qb.push(" AND m.message_id = ").push_bind(id.to_string());
        }
        MessageScope::Session(id) => {
            qb.push(" AND m.session_id = ").push_bind(id.to_string());
        }
        MessageScope::User(user) => {
            qb.push(" AND s.user_id = ").push_bind(user.0);
        }
        MessageScope::UserContent(user, keyword) => {
            qb.push(" AND s.user_id = ").push_bind(user.0);
            qb.push(" AND m.content LIKE ")
                .push_bind(like_pattern(keyword))
                .push(" ESCAPE '\\'");
        }
        MessageScope::UserErrors(user) => {
            qb.push(" AND s.user_id = ").push_bind(user.0);
            qb.push(" AND m.status = 'error'");
        }
    }
    qb
}

/// Effective memberships of a user: active link on an active subscription.
///
/// Aliases: `l` for the link, `sub` for the subscription, `ac.live_articles`
/// for the live article count (NULL when there are none).
pub(crate) fn memberships(columns: &str, user: UserId) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {columns} FROM user_subscriptions l \
         JOIN subscriptions sub ON sub.id = l.subscription_id \
         LEFT JOIN (SELECT subscription_id, COUNT(*) AS live_articles \
         FROM subscription_articles WHERE state = "
    ));
    qb.push_bind(RecordState::Live.to_string())
        .push(" GROUP BY subscription_id) ac ON ac.subscription_id = sub.id WHERE ");
    push_effective_membership(&mut qb, user);
    qb
}

/// `l.status = active AND sub.status = active AND l.user_id = user`.
fn push_effective_membership(qb: &mut QueryBuilder<'static, Sqlite>, user: UserId) {
    qb.push("l.status = ")
        .push_bind(LinkStatus::Active.to_string())
        .push(" AND sub.status = ")
        .push_bind(SubscriptionStatus::Active.to_string())
        .push(" AND l.user_id = ")
        .push_bind(user.0);
}

/// `SELECT {columns} FROM subscription_articles a WHERE <live> AND <scope>`.
pub(crate) fn articles(columns: &str, scope: &ArticleScope) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {columns} FROM subscription_articles a WHERE a.state = "
    ));
    qb.push_bind(RecordState::Live.to_string());
    match scope {
        ArticleScope::Subscription(id) => {
            qb.push(" AND a.subscription_id = ").push_bind(*id);
        }
        ArticleScope::User(user) => {
            qb.push(
                " AND a.subscription_id IN (\
                 SELECT l.subscription_id FROM user_subscriptions l \
                 JOIN subscriptions sub ON sub.id = l.subscription_id WHERE ",
            );
            push_effective_membership(&mut qb, *user);
            qb.push(")");
        }
    }
    qb
}

/// Append `LIMIT ? OFFSET ?` for a resolved page.
pub(crate) fn push_page(qb: &mut QueryBuilder<'static, Sqlite>, page: PageRequest) {
    qb.push(" LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
}

/// `%keyword%` with LIKE metacharacters escaped by backslash.
pub(crate) fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_session_scope_sql() {
        let qb = sessions("COUNT(*)", &SessionScope::UserTopic(UserId(1), "ml".into()));
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM chat_sessions s WHERE s.status != ? \
             AND s.user_id = ? AND s.topic LIKE ? ESCAPE '\\'"
        );
    }

    #[test]
    fn test_message_scope_always_filters_both_levels() {
        let scopes = [
            MessageScope::Id(Uuid::now_v7()),
            MessageScope::Session(Uuid::now_v7()),
            MessageScope::User(UserId(1)),
            MessageScope::UserContent(UserId(1), "x".into()),
            MessageScope::UserErrors(UserId(1)),
        ];
        for scope in &scopes {
            let qb = messages("m.*", scope);
            assert!(qb.sql().contains("WHERE m.state = ? AND s.status != ?"));
        }
    }

    #[test]
    fn test_state_values_are_bound_not_inlined() {
        let sql = [
            sessions("s.*", &SessionScope::User(UserId(1))).sql().to_string(),
            messages("m.*", &MessageScope::User(UserId(1))).sql().to_string(),
            memberships("l.*", UserId(1)).sql().to_string(),
            articles("a.*", &ArticleScope::User(UserId(1))).sql().to_string(),
        ];
        for sql in &sql {
            assert!(!sql.contains('\''), "literal in {sql}");
        }
        assert!(sql[3].contains("l.status = ? AND sub.status = ? AND l.user_id = ?)"));
    }

    #[test]
    fn test_push_page() {
        let mut qb = articles("a.*", &ArticleScope::Subscription(3));
        push_page(&mut qb, PageRequest::resolve(Some(2), Some(5), 10, 100));
        assert!(qb.sql().ends_with("a.subscription_id = ? LIMIT ? OFFSET ?"));
    }
}
