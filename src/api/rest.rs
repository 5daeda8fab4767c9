// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Read-only surface for a dashboard, plus one config endpoint that mirrors
// the sidebar inputs (free-text symbol list, interval selector). All
// snapshots handed out are clones; nothing the client does can mutate the
// monitor's internal state.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::app_state::AppState;
use crate::types::Interval;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/signals", get(signals))
        .route("/api/v1/signals/:symbol", get(signal_for_symbol))
        .route("/api/v1/series/:symbol", get(series_for_symbol))
        .route("/api/v1/config", post(update_config))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ok",
        "state_version": state.current_state_version(),
        "server_time": chrono::Utc::now().timestamp_millis(),
    });
    Json(body)
}

// =============================================================================
// Full state snapshot
// =============================================================================

async fn full_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

// =============================================================================
// Signals
// =============================================================================

async fn signals(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot().signals)
}

async fn signal_for_symbol(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> impl IntoResponse {
    let symbol = symbol.trim().to_uppercase();
    match state.signal(&symbol) {
        Some(result) => Json(result).into_response(),
        None => {
            let body = serde_json::json!({ "error": format!("no signal for {symbol}") });
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    }
}

// =============================================================================
// Enriched series (charting)
// =============================================================================

async fn series_for_symbol(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> impl IntoResponse {
    let symbol = symbol.trim().to_uppercase();
    match state.series(&symbol) {
        Some(series) => Json(series).into_response(),
        None => {
            let body = serde_json::json!({ "error": format!("no series for {symbol}") });
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    }
}

// =============================================================================
// Config
// =============================================================================

/// Sidebar inputs: a free-text comma-separated symbol list and an interval
/// token from the enumerated set. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
struct ConfigUpdateRequest {
    symbols: Option<String>,
    interval: Option<String>,
    refresh_secs: Option<u64>,
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfigUpdateRequest>,
) -> impl IntoResponse {
    if let Some(ref token) = req.interval {
        if Interval::parse(token).is_none() {
            let body = serde_json::json!({
                "error": format!("unknown interval '{token}'; expected one of 1m, 2m, 5m"),
            });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    }

    {
        let mut config = state.runtime_config.write();
        if let Some(ref text) = req.symbols {
            config.set_symbols_from_text(text);
        }
        if let Some(ref token) = req.interval {
            if let Some(interval) = Interval::parse(token) {
                config.interval = interval;
            }
        }
        if let Some(secs) = req.refresh_secs {
            config.refresh_secs = secs.max(1);
        }

        info!(
            symbols = ?config.symbols,
            interval = %config.interval,
            refresh_secs = config.refresh_secs,
            "runtime config updated via API"
        );
    }
    state.increment_version();

    Json(state.build_snapshot().config).into_response()
}
