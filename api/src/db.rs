use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;

use crate::models::{CompletedSessionRow, GroupRow, UpcomingSessionRow, UserRow};

pub async fn init_db(database_url: &str) -> Result<PgPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(50)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(database_url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

pub async fn get_user(pool: &PgPool, user_id: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, first_name, last_name, study_stats, stats_version, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Conditionally write a user's stats document. The write only lands if
/// `stats_version` still matches what the caller read; returns false on a
/// lost race so the caller can re-read and recompute.
pub async fn update_user_stats(
    pool: &PgPool,
    user_id: &str,
    stats: &serde_json::Value,
    expected_version: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET study_stats = $2, stats_version = stats_version + 1
        WHERE id = $1 AND stats_version = $3
        "#,
    )
    .bind(user_id)
    .bind(stats)
    .bind(expected_version)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Up to 5 groups where the user is an active member, most recently
/// updated first. A member entry without an "active" flag counts as
/// active.
pub async fn recent_groups(pool: &PgPool, user_id: &str) -> Result<Vec<GroupRow>, sqlx::Error> {
    sqlx::query_as::<_, GroupRow>(
        r#"
        SELECT
            g.id,
            g.name,
            g.subject,
            jsonb_array_length(g.members)::BIGINT AS member_count,
            g.last_activity
        FROM study_groups g
        WHERE EXISTS (
            SELECT 1 FROM jsonb_array_elements(g.members) AS m
            WHERE m->>'user' = $1
              AND COALESCE((m->>'active')::boolean, TRUE)
        )
        ORDER BY g.updated_at DESC
        LIMIT 5
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Up to 5 sessions the user hosts or participates in that have not
/// started yet, soonest first, with the group name and host name joined
/// in for display.
pub async fn upcoming_sessions(
    pool: &PgPool,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<UpcomingSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, UpcomingSessionRow>(
        r#"
        SELECT
            s.id,
            s.title,
            g.name AS group_name,
            s.scheduled_start,
            u.first_name AS host_first_name,
            u.last_name AS host_last_name
        FROM study_sessions s
        LEFT JOIN study_groups g ON g.id = s.group_id
        LEFT JOIN users u ON u.id = s.host
        WHERE s.scheduled_start >= $2
          AND s.status IN ('scheduled', 'active')
          AND (
            s.host = $1
            OR EXISTS (
                SELECT 1 FROM jsonb_array_elements(s.participants) AS p
                WHERE p->>'user' = $1
            )
          )
        ORDER BY s.scheduled_start ASC
        LIMIT 5
        "#,
    )
    .bind(user_id)
    .bind(now)
    .fetch_all(pool)
    .await
}

/// Completed sessions the user participated in whose `actual_end` falls
/// within `[start, end)`. Participants come back as raw JSONB; the
/// per-user duration lookup lives in the dashboard module.
pub async fn completed_sessions_between(
    pool: &PgPool,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<CompletedSessionRow>, sqlx::Error> {
    sqlx::query_as::<_, CompletedSessionRow>(
        r#"
        SELECT s.id, s.participants
        FROM study_sessions s
        WHERE s.status = 'completed'
          AND s.actual_end >= $2
          AND s.actual_end < $3
          AND EXISTS (
            SELECT 1 FROM jsonb_array_elements(s.participants) AS p
            WHERE p->>'user' = $1
          )
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}
