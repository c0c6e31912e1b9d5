use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Local;
use serde::Serialize;

use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::services::integrated::{self, IntegratedProgress};
use crate::services::missions::{self, DailyMissions};
use crate::services::{calendar, habits};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_dashboard))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardData {
    progress: IntegratedProgress,
    missions: Option<DailyMissions>,
    weekly_reset: bool,
}

async fn get_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers)?;
    let store = state.store();
    let today = calendar::today();

    let weekly_reset = habits::reset_weekly_habits(store, &user.id, Local::now())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(user_id = %user.id, error = %e, "weekly habit reset skipped");
            false
        });

    let (progress, missions) = tokio::join!(
        integrated::get_integrated_progress(store, &user.id, today),
        missions::get_daily_missions(store, &user.id, today),
    );
    let missions = missions
        .map_err(|e| tracing::warn!(user_id = %user.id, error = %e, "daily missions unavailable"))
        .ok();

    Ok(ok(DashboardData {
        progress,
        missions,
        weekly_reset,
    }))
}
