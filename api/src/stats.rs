use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const FIRST_HOUR: &str = "first-hour";
pub const WEEK_STREAK: &str = "week-streak";
pub const SESSION_MASTER: &str = "session-master";

/// A user's running study statistics, stored as a JSONB document on the
/// user row and mutated only through [`record_study_time`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserStudyStats {
    pub total_study_time: u32,
    pub sessions_completed: u32,
    pub streak: u32,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_study_date: Option<NaiveDate>,
}

impl UserStudyStats {
    fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a == id)
    }
}

/// Apply a completed study session of `duration_minutes` to `stats`.
///
/// Returns the updated stats together with the achievement identifiers
/// newly unlocked by this call, in check order. Achievements accumulate
/// monotonically: a threshold that is already satisfied never re-unlocks.
/// Persistence is the caller's responsibility.
pub fn record_study_time(
    stats: &UserStudyStats,
    duration_minutes: u32,
    today: NaiveDate,
) -> Result<(UserStudyStats, Vec<String>), ApiError> {
    if duration_minutes < 1 {
        return Err(ApiError::InvalidInput(
            "duration must be at least 1 minute".into(),
        ));
    }

    let mut updated = stats.clone();
    updated.total_study_time = stats
        .total_study_time
        .checked_add(duration_minutes)
        .ok_or_else(|| ApiError::InvalidInput("duration overflows total study time".into()))?;
    updated.sessions_completed = stats.sessions_completed.saturating_add(1);

    // A missing last_study_date behaves like a gap of more than one day.
    let diff_days = stats
        .last_study_date
        .map(|last| today.signed_duration_since(last).num_days());

    match diff_days {
        Some(0) => {}
        Some(1) => updated.streak = stats.streak.saturating_add(1),
        _ => updated.streak = 1,
    }

    updated.last_study_date = Some(today);

    let mut unlocked = Vec::new();
    let thresholds = [
        (updated.total_study_time >= 60, FIRST_HOUR),
        (updated.streak >= 7, WEEK_STREAK),
        (updated.sessions_completed >= 10, SESSION_MASTER),
    ];

    for (crossed, id) in thresholds {
        if crossed && !updated.has_achievement(id) {
            updated.achievements.push(id.to_string());
            unlocked.push(id.to_string());
        }
    }

    Ok((updated, unlocked))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stats_with(
        total: u32,
        sessions: u32,
        streak: u32,
        last: Option<NaiveDate>,
    ) -> UserStudyStats {
        UserStudyStats {
            total_study_time: total,
            sessions_completed: sessions,
            streak,
            achievements: Vec::new(),
            last_study_date: last,
        }
    }

    #[test]
    fn rejects_zero_duration() {
        let stats = UserStudyStats::default();
        let err = record_study_time(&stats, 0, date(2025, 3, 10)).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn accumulates_time_and_session_count() {
        let stats = stats_with(40, 3, 2, Some(date(2025, 3, 9)));
        let (updated, _) = record_study_time(&stats, 25, date(2025, 3, 10)).unwrap();
        assert_eq!(updated.total_study_time, 65);
        assert_eq!(updated.sessions_completed, 4);
        assert_eq!(updated.last_study_date, Some(date(2025, 3, 10)));
    }

    #[test]
    fn streak_grows_on_consecutive_day() {
        let stats = stats_with(10, 1, 3, Some(date(2025, 3, 9)));
        let (updated, _) = record_study_time(&stats, 5, date(2025, 3, 10)).unwrap();
        assert_eq!(updated.streak, 4);
    }

    #[test]
    fn streak_resets_after_gap() {
        let stats = stats_with(10, 1, 6, Some(date(2025, 3, 5)));
        let (updated, _) = record_study_time(&stats, 5, date(2025, 3, 10)).unwrap();
        assert_eq!(updated.streak, 1);
    }

    #[test]
    fn streak_unchanged_same_day() {
        let stats = stats_with(10, 1, 3, Some(date(2025, 3, 10)));
        let (updated, _) = record_study_time(&stats, 5, date(2025, 3, 10)).unwrap();
        assert_eq!(updated.streak, 3);
    }

    #[test]
    fn rejects_duration_that_overflows_total_time() {
        let stats = stats_with(0, 0, 0, None);
        let (updated, _) = record_study_time(&stats, u32::MAX, date(2025, 3, 10)).unwrap();
        assert_eq!(updated.total_study_time, u32::MAX);

        let err = record_study_time(&updated, 1, date(2025, 3, 11)).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn missing_last_date_starts_streak_at_one() {
        let stats = stats_with(0, 0, 0, None);
        let (updated, _) = record_study_time(&stats, 30, date(2025, 3, 10)).unwrap();
        assert_eq!(updated.streak, 1);
    }

    #[test]
    fn unlocks_all_three_in_check_order() {
        // 55 minutes, 9 sessions, 6-day streak, last studied yesterday.
        let stats = stats_with(55, 9, 6, Some(date(2025, 3, 9)));
        let (updated, unlocked) = record_study_time(&stats, 10, date(2025, 3, 10)).unwrap();
        assert_eq!(updated.total_study_time, 65);
        assert_eq!(updated.sessions_completed, 10);
        assert_eq!(updated.streak, 7);
        assert_eq!(unlocked, vec![FIRST_HOUR, WEEK_STREAK, SESSION_MASTER]);
        assert_eq!(updated.achievements, unlocked);
    }

    #[test]
    fn three_day_gap_resets_streak_and_skips_week_streak() {
        let stats = stats_with(55, 9, 6, Some(date(2025, 3, 7)));
        let (updated, unlocked) = record_study_time(&stats, 10, date(2025, 3, 10)).unwrap();
        assert_eq!(updated.streak, 1);
        assert!(!unlocked.contains(&WEEK_STREAK.to_string()));
        assert_eq!(unlocked, vec![FIRST_HOUR, SESSION_MASTER]);
    }

    #[test]
    fn achievements_unlock_only_once() {
        let stats = stats_with(30, 1, 1, Some(date(2025, 3, 9)));
        let (first, unlocked) = record_study_time(&stats, 40, date(2025, 3, 10)).unwrap();
        assert_eq!(unlocked, vec![FIRST_HOUR]);

        let (second, unlocked) = record_study_time(&first, 40, date(2025, 3, 10)).unwrap();
        assert!(unlocked.is_empty());
        assert_eq!(second.achievements, vec![FIRST_HOUR]);
    }
}
