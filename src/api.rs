use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::StoreError;
use crate::model::EnrichedTick;
use crate::query::{effective_limit, QueryService};

#[derive(Clone)]
pub struct ApiState {
    query: Arc<QueryService>,
}

/// HTTP exposure of the query service: latest price, recent history and
/// liveness probes.
pub fn router(query: Arc<QueryService>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/prices/{symbol}", get(get_latest_price))
        .route("/prices/{symbol}/history", get(get_price_history))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(ApiState { query })
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(300))
}

#[derive(Debug, Serialize)]
struct PricePoint {
    symbol: String,
    price: f64,
    volume: f64,
    timestamp: DateTime<Utc>,
    is_anomaly: bool,
}

impl From<EnrichedTick> for PricePoint {
    fn from(t: EnrichedTick) -> Self {
        Self {
            symbol: t.symbol,
            price: t.price,
            volume: t.volume,
            timestamp: t.ts,
            is_anomaly: t.is_anomaly,
        }
    }
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    symbol: String,
    limit: u32,
    count: usize,
    history: Vec<PricePoint>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    /// Kept as text so a non-numeric value falls back to the default
    /// instead of failing extraction.
    limit: Option<String>,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

async fn get_latest_price(
    State(state): State<ApiState>,
    Path(symbol): Path<String>,
) -> Response {
    match state.query.latest(&symbol).await {
        Ok(Some(tick)) => (StatusCode::OK, Json(PricePoint::from(tick))).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "symbol not found"),
        Err(e) => {
            tracing::error!(symbol = %symbol, error = %e, "latest price lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

async fn get_price_history(
    State(state): State<ApiState>,
    Path(symbol): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Response {
    let limit = effective_limit(params.limit.as_deref());
    match state.query.history(&symbol, limit).await {
        Ok(rows) => {
            let history: Vec<PricePoint> = rows.into_iter().map(PricePoint::from).collect();
            let body = HistoryResponse {
                symbol,
                limit,
                count: history.len(),
                history,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!(symbol = %symbol, error = %e, "history query failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    postgres: String,
    redis: String,
}

fn probe_label(result: &Result<(), StoreError>) -> String {
    match result {
        Ok(()) => "ok".to_string(),
        Err(e) => e.to_string(),
    }
}

/// Probes both dependencies so a degraded response names exactly which of
/// the two is unreachable.
async fn health(State(state): State<ApiState>) -> Response {
    let (postgres, redis) = tokio::join!(state.query.ping_durable(), state.query.ping_cache());

    let healthy = postgres.is_ok() && redis.is_ok();
    let body = HealthBody {
        status: if healthy { "ok" } else { "degraded" },
        postgres: probe_label(&postgres),
        redis: probe_label(&redis),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}
