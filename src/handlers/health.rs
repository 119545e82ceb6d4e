use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use super::AppState;

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "im ready",
            "hostname": state.collector.hostname(),
            "first_run": state.collector.is_first_run(),
            "UTC_time": chrono::Utc::now().to_rfc2822(),
        })),
    )
}
