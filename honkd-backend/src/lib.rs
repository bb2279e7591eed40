//! honkd-backend
//!
//! Axum HTTP service wrapping the witness encoder and the version-pinned
//! UltraHonk proving executable.

use std::{env, net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use honkd_abi::{encode_inputs, Abi, InputMap, WitnessMap};
use honkd_prover::{prove_ultra_honk, BinaryRegistry, ProveOptions, ProverError};

const PORT_ENV: &str = "PORT";
const DEFAULT_PORT: u16 = 3000;

const CODE_INVALID_THREADS: &str = "INVALID_THREADS";
const CODE_MISSING_BB_VERSION: &str = "MISSING_BB_VERSION";
const CODE_MISSING_WITNESS: &str = "MISSING_WITNESS";
const CODE_MISSING_CIRCUIT: &str = "MISSING_CIRCUIT";
const CODE_UNSUPPORTED_BB_VERSION: &str = "UNSUPPORTED_BB_VERSION";
const CODE_INVALID_BASE64: &str = "INVALID_BASE64";

#[derive(Clone)]
pub struct AppState {
    registry: Arc<BinaryRegistry>,
}

impl AppState {
    pub fn new(registry: BinaryRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn from_env() -> Self {
        Self::new(BinaryRegistry::from_env())
    }

    pub fn registry(&self) -> &BinaryRegistry {
        &self.registry
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    supported_versions: Option<Vec<String>>,
}

impl ApiError {
    fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.into(),
            supported_versions: None,
        }
    }

    fn with_versions(mut self, registry: &BinaryRegistry) -> Self {
        self.supported_versions = Some(registry.supported_versions());
        self
    }

    fn from_prover(err: ProverError) -> Self {
        let status = match err {
            ProverError::InvalidThreads => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            code: err.error_code(),
            message: err.to_string(),
            supported_versions: None,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    supported_versions: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
            error_code: self.code,
            supported_versions: self.supported_versions,
        };
        (self.status, Json(body)).into_response()
    }
}

pub async fn serve() {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = app_router(AppState::from_env()).layer(cors);

    let port: u16 = env::var(PORT_ENV)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("honkd backend listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("shutdown signal received");
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/prove", post(prove_handler))
        .route("/witness", post(witness_handler))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "supported_versions": state.registry().supported_versions(),
    }))
}

#[derive(Deserialize)]
struct ProveRequest {
    bb_version: Option<String>,
    /// Base64-encoded compressed witness blob.
    witness: Option<String>,
    /// Base64-encoded compiled circuit.
    circuit: Option<String>,
    threads: Option<i64>,
    #[serde(default)]
    stats: bool,
    #[serde(default)]
    logging: bool,
}

#[derive(Serialize)]
struct ProveResponse {
    success: bool,
    proof: String,
    bbout: String,
}

async fn prove_handler(
    State(state): State<AppState>,
    Json(req): Json<ProveRequest>,
) -> Result<Json<ProveResponse>, ApiError> {
    if let Some(threads) = req.threads {
        if threads <= 0 {
            return Err(ApiError::bad_request(
                CODE_INVALID_THREADS,
                "threads parameter must be a positive number",
            ));
        }
    }

    let registry = state.registry();
    let bb_version = req.bb_version.ok_or_else(|| {
        ApiError::bad_request(
            CODE_MISSING_BB_VERSION,
            "missing bb_version in request body",
        )
        .with_versions(registry)
    })?;
    let witness_b64 = req.witness.ok_or_else(|| {
        ApiError::bad_request(CODE_MISSING_WITNESS, "missing witness field in request body")
    })?;
    let circuit_b64 = req.circuit.ok_or_else(|| {
        ApiError::bad_request(CODE_MISSING_CIRCUIT, "missing circuit field in request body")
    })?;

    let binary = registry.resolve(&bb_version).ok_or_else(|| {
        ApiError::bad_request(
            CODE_UNSUPPORTED_BB_VERSION,
            format!("unsupported bb version: {bb_version}"),
        )
        .with_versions(registry)
    })?;

    let witness = BASE64.decode(witness_b64.as_bytes()).map_err(|err| {
        ApiError::bad_request(CODE_INVALID_BASE64, format!("witness is not valid base64: {err}"))
    })?;
    let circuit = BASE64.decode(circuit_b64.as_bytes()).map_err(|err| {
        ApiError::bad_request(CODE_INVALID_BASE64, format!("circuit is not valid base64: {err}"))
    })?;

    let options = ProveOptions {
        threads: req.threads.map(|t| t as u32),
        stats: req.stats,
        logging: req.logging,
    };

    let outcome = prove_ultra_honk(binary, &circuit, &witness, &options)
        .await
        .map_err(ApiError::from_prover)?;

    Ok(Json(ProveResponse {
        success: true,
        proof: BASE64.encode(outcome.proof),
        bbout: outcome.stderr,
    }))
}

#[derive(Deserialize)]
struct WitnessRequest {
    abi: Abi,
    inputs: InputMap,
    #[serde(default)]
    start_index: u32,
}

#[derive(Serialize)]
struct WitnessResponse {
    length: usize,
    witness: WitnessMap,
}

async fn witness_handler(
    Json(req): Json<WitnessRequest>,
) -> Result<Json<WitnessResponse>, ApiError> {
    let witness = encode_inputs(&req.inputs, &req.abi.parameters, req.start_index)
        .map_err(|err| ApiError::bad_request(err.code(), err.to_string()))?;
    Ok(Json(WitnessResponse {
        length: witness.len(),
        witness,
    }))
}
