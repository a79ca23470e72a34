use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;

use crate::db;
use crate::error::ApiError;
use crate::models::{CompletedSessionRow, GroupRow, UpcomingSessionRow};
use crate::stats::UserStudyStats;

/// Display name for a session whose group was deleted or never set.
const GROUP_PLACEHOLDER: &str = "Study Group";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub recent_groups: Vec<RecentGroup>,
    pub upcoming_sessions: Vec<UpcomingSession>,
    pub stats: UserStudyStats,
    pub today_progress: u32,
    pub week_progress: u32,
    pub weekly_goal: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentGroup {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub member_count: u32,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingSession {
    pub id: String,
    pub title: String,
    pub group_name: String,
    pub time: DateTime<Utc>,
    pub host_name: String,
}

/// Build the dashboard payload for one user. The five storage queries
/// are independent and read-only, so they run concurrently; any failure
/// aborts the whole build rather than producing a partial snapshot.
pub async fn build_dashboard(
    pool: &PgPool,
    user_id: &str,
    now: DateTime<Utc>,
    weekly_goal: u32,
) -> Result<DashboardSnapshot, ApiError> {
    let today = now.date_naive();
    let (today_start, today_end) = day_window(today);
    let (week_begin, week_end) = week_window(today);

    let (user, groups, sessions, today_rows, week_rows) = futures::try_join!(
        db::get_user(pool, user_id),
        db::recent_groups(pool, user_id),
        db::upcoming_sessions(pool, user_id, now),
        db::completed_sessions_between(pool, user_id, today_start, today_end),
        db::completed_sessions_between(pool, user_id, week_begin, week_end),
    )?;

    let user = user.ok_or_else(|| ApiError::NotFound(format!("user {}", user_id)))?;
    let stats: UserStudyStats = serde_json::from_value(user.study_stats).unwrap_or_default();

    Ok(DashboardSnapshot {
        recent_groups: groups.into_iter().map(RecentGroup::from).collect(),
        upcoming_sessions: sessions.into_iter().map(UpcomingSession::from).collect(),
        stats,
        today_progress: sum_participation(&today_rows, user_id),
        week_progress: sum_participation(&week_rows, user_id),
        weekly_goal,
    })
}

impl From<GroupRow> for RecentGroup {
    fn from(row: GroupRow) -> Self {
        RecentGroup {
            id: row.id,
            name: row.name,
            subject: row.subject,
            member_count: row.member_count.max(0) as u32,
            last_activity: row.last_activity,
        }
    }
}

impl From<UpcomingSessionRow> for UpcomingSession {
    fn from(row: UpcomingSessionRow) -> Self {
        UpcomingSession {
            id: row.id,
            title: row.title,
            group_name: row
                .group_name
                .unwrap_or_else(|| GROUP_PLACEHOLDER.to_string()),
            time: row.scheduled_start,
            host_name: full_name(row.host_first_name.as_deref(), row.host_last_name.as_deref()),
        }
    }
}

/// Look up the caller's entry in a session's `participants` array and
/// return its logged duration in minutes. An entry without a duration
/// counts as 0; no entry at all is None.
pub fn find_participation(participants: &serde_json::Value, user_id: &str) -> Option<u32> {
    participants
        .as_array()?
        .iter()
        .find(|p| p.get("user").and_then(|u| u.as_str()) == Some(user_id))
        .map(|p| {
            let minutes = p.get("duration").and_then(|d| d.as_u64()).unwrap_or(0);
            u32::try_from(minutes).unwrap_or(u32::MAX)
        })
}

fn sum_participation(rows: &[CompletedSessionRow], user_id: &str) -> u32 {
    rows.iter()
        .map(|row| find_participation(&row.participants, user_id).unwrap_or(0))
        .sum()
}

/// [midnight today, midnight tomorrow) in UTC.
fn day_window(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = today.and_time(NaiveTime::MIN).and_utc();
    let end = (today + Days::new(1)).and_time(NaiveTime::MIN).and_utc();
    (start, end)
}

/// The current calendar week as a 7-day window starting Sunday.
fn week_window(today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_date = week_start(today);
    let start = start_date.and_time(NaiveTime::MIN).and_utc();
    let end = (start_date + Days::new(7)).and_time(NaiveTime::MIN).and_utc();
    (start, end)
}

fn week_start(today: NaiveDate) -> NaiveDate {
    today - Days::new(u64::from(today.weekday().num_days_from_sunday()))
}

fn full_name(first: Option<&str>, last: Option<&str>) -> String {
    format!("{} {}", first.unwrap_or(""), last.unwrap_or(""))
        .trim()
        .to_string()
}
