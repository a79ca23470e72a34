use std::{env, fmt::Display, str::FromStr};

/// Default weekly study goal in minutes. Global for now; a per-user goal
/// would move this onto the user document.
pub const DEFAULT_WEEKLY_GOAL_MINUTES: u32 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub weekly_goal_minutes: u32,
}

impl Config {
    pub fn load() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/studygroup".to_string()),
            port: try_load("PORT", "3001"),
            weekly_goal_minutes: try_load(
                "WEEKLY_GOAL_MINUTES",
                &DEFAULT_WEEKLY_GOAL_MINUTES.to_string(),
            ),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        tracing::debug!("{} not set, using default: {}", key, default);
        default.to_string()
    });

    match raw.parse() {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("invalid {} value {:?} ({}), using default", key, raw, e);
            default
                .parse()
                .map_err(|e| {
                    tracing::error!("invalid default for {}: {}", key, e);
                })
                .expect("default must parse")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_on_garbage_value() {
        std::env::set_var("STUDYGROUP_TEST_PORT", "not-a-number");
        let port: u16 = try_load("STUDYGROUP_TEST_PORT", "3001");
        assert_eq!(port, 3001);
        std::env::remove_var("STUDYGROUP_TEST_PORT");
    }

    #[test]
    fn uses_default_when_unset() {
        let goal: u32 = try_load("STUDYGROUP_TEST_UNSET", "300");
        assert_eq!(goal, 300);
    }
}
