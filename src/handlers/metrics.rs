use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use prometheus::TEXT_FORMAT;

use super::AppState;

/// Отдаёт накопленные счётчики в текстовом формате Prometheus
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, (StatusCode, String)> {
    let body = state.collector.metrics().render().map_err(|e| {
        tracing::error!(error = %format!("{:#}", e), "Не удалось отдать метрики");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(([(header::CONTENT_TYPE, TEXT_FORMAT)], body))
}
