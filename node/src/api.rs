//! # HTTP Read Surface
//!
//! Builds the axum router for the configuration and asset server. The
//! surface is deliberately tiny:
//!
//! | Method | Path      | Description                                  |
//! |--------|-----------|----------------------------------------------|
//! | GET    | `/`       | Human-facing registry page                   |
//! | GET    | `/config` | Component schemas + deployed registry address |
//!
//! Nothing else exists — every other path falls through to a JSON 404.
//! The node never talks to the ledger itself; it only hands the frontend
//! what it needs to do so.

use axum::{
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Component schemas, embedded at compile time so the server has no
/// runtime file dependencies.
const REGISTRY_ABI: &str = include_str!("../abi/registry.json");
const ESCROW_ABI: &str = include_str!("../abi/escrow.json");
const CERTIFICATE_ABI: &str = include_str!("../abi/certificate.json");

/// The human-facing page.
const INDEX_HTML: &str = include_str!("../static/index.html");

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ledger address of the deployed registry, or empty when not yet
    /// configured. An empty value is not an error — the read surface must
    /// stay up regardless.
    pub registry_address: String,
    /// The node's reported version string.
    pub version: String,
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// The three component schemas, as parsed JSON documents.
#[derive(Debug, Serialize, Deserialize)]
pub struct AbiBundle {
    pub registry: serde_json::Value,
    pub escrow: serde_json::Value,
    pub certificate: serde_json::Value,
}

/// Response payload for `GET /config`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigResponse {
    /// Deployed registry address; empty string when unconfigured.
    pub registry_address: String,
    /// System-wide withdrawal timelock, surfaced so the frontend can show
    /// accurate countdowns.
    pub timelock_secs: u64,
    /// Node software version.
    pub version: String,
    /// Component schemas for the registry, escrow, and certificate issuer.
    pub abi: AbiBundle,
    /// ISO-8601 timestamp of the response.
    pub generated_at: String,
}

/// Generic error body for the 404 fallback.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with both routes, the 404 fallback,
/// CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/config", get(config_handler))
        .fallback(not_found_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /` — serves the embedded registry page.
async fn index_handler() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "public, max-age=300")],
        Html(INDEX_HTML),
    )
}

/// `GET /config` — serves the schema bundle and the registry address.
///
/// The schemas are static compile-time data; only the registry address and
/// the timestamp vary between deployments.
async fn config_handler(State(state): State<AppState>) -> impl IntoResponse {
    let resp = ConfigResponse {
        registry_address: state.registry_address.clone(),
        timelock_secs: vowlock_contracts::config::WITHDRAWAL_TIMELOCK_SECS,
        version: state.version.clone(),
        abi: AbiBundle {
            registry: parse_abi(REGISTRY_ABI),
            escrow: parse_abi(ESCROW_ABI),
            certificate: parse_abi(CERTIFICATE_ABI),
        },
        generated_at: chrono::Utc::now().to_rfc3339(),
    };
    Json(resp)
}

/// Fallback for every path outside the two-route surface.
async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "not found".into(),
        }),
    )
}

/// Parses an embedded schema document. The inputs are compile-time
/// constants validated by tests, so a parse failure here is a build
/// defect, not a runtime condition.
fn parse_abi(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).expect("embedded ABI document is valid JSON")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
