use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub study_stats: serde_json::Value,
    pub stats_version: i64,
    pub created_at: DateTime<Utc>,
}

/// A group row with its member count pre-computed from the JSONB
/// `members` array by the query.
#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub member_count: i64,
    pub last_activity: DateTime<Utc>,
}

/// An upcoming session joined with its group's name and its host's name
/// parts. Both joins are left joins, so every piece may be absent.
#[derive(Debug, Clone, FromRow)]
pub struct UpcomingSessionRow {
    pub id: String,
    pub title: String,
    pub group_name: Option<String>,
    pub scheduled_start: DateTime<Utc>,
    pub host_first_name: Option<String>,
    pub host_last_name: Option<String>,
}

/// A completed session's participants array, kept as raw JSONB so the
/// per-user duration lookup happens in one place.
#[derive(Debug, Clone, FromRow)]
pub struct CompletedSessionRow {
    pub id: String,
    pub participants: serde_json::Value,
}
