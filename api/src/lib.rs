use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod models;
pub mod stats;

use error::ApiError;
use stats::UserStudyStats;

#[derive(Clone)]
struct AppState {
    db: PgPool,
    weekly_goal_minutes: u32,
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct StudyTimePayload {
    duration: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StudyTimeResponse {
    stats: UserStudyStats,
    new_achievements: Vec<String>,
}

#[axum::debug_handler]
async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<dashboard::DashboardSnapshot>, ApiError> {
    let snapshot = dashboard::build_dashboard(
        &state.db,
        &params.user_id,
        Utc::now(),
        state.weekly_goal_minutes,
    )
    .await?;

    Ok(Json(snapshot))
}

// Read-modify-write with a version check per attempt; a concurrent
// completion for the same user bumps the version and fails the write,
// and we retry from a fresh read.
const STATS_UPDATE_RETRIES: u32 = 5;

#[axum::debug_handler]
async fn post_study_time(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
    Json(payload): Json<StudyTimePayload>,
) -> Result<Json<StudyTimeResponse>, ApiError> {
    let duration = payload
        .duration
        .ok_or_else(|| ApiError::InvalidInput("duration is required".into()))?;
    let user_id = &params.user_id;
    let today = Utc::now().date_naive();

    for attempt in 0..STATS_UPDATE_RETRIES {
        let user = db::get_user(&state.db, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("user {}", user_id)))?;

        let current: UserStudyStats =
            serde_json::from_value(user.study_stats).unwrap_or_default();
        let (updated, new_achievements) = stats::record_study_time(&current, duration, today)?;

        let stats_json = serde_json::to_value(&updated)?;

        if db::update_user_stats(&state.db, user_id, &stats_json, user.stats_version).await? {
            if !new_achievements.is_empty() {
                tracing::info!(
                    "user {} unlocked achievements: {}",
                    user_id,
                    new_achievements.join(", ")
                );
            }
            return Ok(Json(StudyTimeResponse {
                stats: updated,
                new_achievements,
            }));
        }

        tracing::warn!(
            "stats version conflict for user {} (attempt {}/{})",
            user_id,
            attempt + 1,
            STATS_UPDATE_RETRIES
        );
    }

    tracing::error!(
        "giving up on stats update for user {} after {} attempts",
        user_id,
        STATS_UPDATE_RETRIES
    );
    Err(ApiError::Contention)
}

async fn health_check() -> &'static str {
    "ok"
}

pub async fn run() {
    tracing_subscriber::fmt()
        .with_env_filter("studygroup_api=debug,tower_http=debug")
        .init();

    let config = config::Config::load();

    let db = db::init_db(&config.database_url)
        .await
        .expect("failed to initialize database");
    tracing::info!("database initialized");

    let state = AppState {
        db,
        weekly_goal_minutes: config.weekly_goal_minutes,
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/study-time", post(post_study_time))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
