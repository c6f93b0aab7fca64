//! proofgate HTTP server.
//!
//! Serves one compiled domain pipeline:
//!
//! - `GET  /health`: server status
//! - `GET  /domain`: summary of the loaded domain pack
//! - `POST /decide`: `{"problem": "...", "time_budget_ms": 500}` → Decision JSON
//!
//! Configuration comes from the environment: `PROOFGATE_BIND`,
//! `PROOFGATE_PORT`, `PROOFGATE_DOMAIN` (id or path), `PROOFGATE_DOMAINS_DIR`
//! and `PROOFGATE_BUDGET_MS` (default per-request budget).
//!
//! Build and run: `cargo run --features server --bin proofgated`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use proofgate::decision::Decision;
use proofgate::domain::{DomainRegistry, DomainSummary, DEFAULT_DOMAIN};
use proofgate::pipeline::DecisionPipeline;

/// Default per-request budget when neither the request nor the environment
/// sets one.
const DEFAULT_BUDGET_MS: u64 = 2_000;

/// Slack granted to the transport timeout on top of the pipeline budget.
const TRANSPORT_GRACE: Duration = Duration::from_millis(250);

// ── Server state ──────────────────────────────────────────────────────────

struct ServerState {
    pipeline: Arc<DecisionPipeline>,
    domain: DomainSummary,
    default_budget: Duration,
}

// ── Request / response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct DecideRequest {
    #[serde(default)]
    problem: Option<String>,
    #[serde(default)]
    time_budget_ms: Option<u64>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    domain: String,
    facts: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        domain: state.domain.id.clone(),
        facts: state.pipeline.knowledge().len(),
    })
}

async fn domain(State(state): State<Arc<ServerState>>) -> Json<DomainSummary> {
    Json(state.domain.clone())
}

async fn decide(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<DecideRequest>,
) -> Response {
    let Some(problem) = req.problem.filter(|p| !p.trim().is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "\"problem\" must be a non-empty string");
    };
    let budget = req
        .time_budget_ms
        .map(Duration::from_millis)
        .unwrap_or(state.default_budget);

    let pipeline = Arc::clone(&state.pipeline);
    let task = tokio::task::spawn_blocking(move || pipeline.decide_within(&problem, budget));

    match tokio::time::timeout(budget + TRANSPORT_GRACE, task).await {
        Ok(Ok(decision)) => Json::<Decision>(decision).into_response(),
        Ok(Err(e)) => {
            tracing::error!("decision task failed: {e}");
            error(StatusCode::INTERNAL_SERVER_ERROR, "decision task failed")
        }
        Err(_) => {
            tracing::warn!(budget_ms = budget.as_millis() as u64, "transport timeout");
            error(
                StatusCode::GATEWAY_TIMEOUT,
                format!("no decision within {} ms", budget.as_millis()),
            )
        }
    }
}

// ── Main ──────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let bind = std::env::var("PROOFGATE_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PROOFGATE_PORT").unwrap_or_else(|_| "8300".to_string());
    let addr = format!("{bind}:{port}");

    let default_budget = std::env::var("PROOFGATE_BUDGET_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(DEFAULT_BUDGET_MS));

    let registry = match std::env::var("PROOFGATE_DOMAINS_DIR") {
        Ok(dir) => DomainRegistry::discover(&PathBuf::from(dir)),
        Err(_) => DomainRegistry::bundled(),
    };
    let domain_id =
        std::env::var("PROOFGATE_DOMAIN").unwrap_or_else(|_| DEFAULT_DOMAIN.to_string());

    let pack = registry.resolve(&domain_id).unwrap_or_else(|e| {
        tracing::error!("failed to load domain \"{domain_id}\": {e}");
        std::process::exit(1);
    });
    let pipeline = pack.compile().unwrap_or_else(|e| {
        tracing::error!("failed to compile domain \"{domain_id}\": {e}");
        std::process::exit(1);
    });

    let state = Arc::new(ServerState {
        pipeline: Arc::new(pipeline),
        domain: pack.summary(),
        default_budget,
    });

    tracing::info!(
        domain = %pack.id,
        budget_ms = default_budget.as_millis() as u64,
        "proofgate server initialized"
    );

    let app = Router::new()
        .route("/health", get(health))
        .route("/domain", get(domain))
        .route("/decide", post(decide))
        .layer(CorsLayer::permissive())
        .with_state(state);

    tracing::info!("proofgate server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}
