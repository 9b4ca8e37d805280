use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::{api::state::AppState, error::Result};

pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "name": "Tollgate API",
        "version": env!("CARGO_PKG_VERSION"),
        "message": state.settings.app.welcome_message,
        "endpoints": {
            "health": "/health",
            "auth": "/auth/register",
            "tariffs": "/api/tariffs/active",
            "payments": "/api/payments",
            "admin": "/admin"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

pub async fn vpn_status(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let status = state.service_context.status.vpn_status().await?;
    Ok(Json(status))
}
