//! RPC gateway service - the node's HTTP surface.
//!
//! `POST /checknode` carries the peer JSON-RPC protocol. The `/sync/*` and
//! `/delivery/*` routes trigger one coordinator operation each and answer
//! with its `OK:`/`NG:` text.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ql_03_chain_sync::{PeerRpcApi, SyncApi, SyncError, SyncOutcome};
use serde_json::Value;
use shared_types::{JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::domain::{ApiError, GatewayConfig, GatewayError};
use crate::middleware::{AuthConfig, AuthLayer};

/// Handlers' shared state.
#[derive(Clone)]
struct AppState {
    sync: Arc<dyn SyncApi>,
    rpc: Arc<dyn PeerRpcApi>,
}

/// The HTTP surface of one node.
pub struct RpcGateway {
    config: GatewayConfig,
    state: AppState,
}

impl RpcGateway {
    /// Gateway serving `sync` operations and `rpc` peer methods.
    pub fn new(
        config: GatewayConfig,
        sync: Arc<dyn SyncApi>,
        rpc: Arc<dyn PeerRpcApi>,
    ) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        Ok(Self {
            config,
            state: AppState { sync, rpc },
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The full router, middleware included.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/checknode", post(handle_json_rpc))
            .route("/sync/gen", post(create_genesis))
            .route("/sync/poolsync", post(sync_pool))
            .route("/sync/blockdiff", post(sync_blocks))
            .route("/sync/blocksync", post(full_resync))
            .route("/sync/resolvefork", post(resolve_forks))
            .route("/sync/audit", post(audit_chain))
            .route("/delivery/deliverypool", post(propagate_pool))
            .route("/health", get(health_check))
            .route("/metrics", get(metrics))
            .layer(AuthLayer::new(AuthConfig {
                api_key: self.config.api_key.clone(),
            }))
            .layer(RequestBodyLimitLayer::new(self.config.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, GatewayError> {
        let addr = self.config.bind_addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))
    }

    /// Serve on `listener` until `shutdown` resolves, then drain.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        info!(%addr, auth = self.config.api_key.is_some(), "[ql-04] RPC gateway listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| GatewayError::Server(e.to_string()))?;

        info!("[ql-04] RPC gateway stopped");
        Ok(())
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }
}

// =============================================================================
// PEER JSON-RPC
// =============================================================================

async fn handle_json_rpc(State(state): State<AppState>, body: String) -> Response {
    let request: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            let error = ApiError::parse_error(e);
            return (
                StatusCode::BAD_REQUEST,
                Json(JsonRpcResponse::failure(Value::Null, error.code, error.message)),
            )
                .into_response();
        }
    };

    match request {
        Value::Array(batch) => {
            let mut responses = Vec::with_capacity(batch.len());
            for item in batch {
                responses.push(process_single_request(&state, item).await);
            }
            Json(responses).into_response()
        }
        single => Json(process_single_request(&state, single).await).into_response(),
    }
}

async fn process_single_request(state: &AppState, request: Value) -> JsonRpcResponse {
    let failure = |id: Value, err: ApiError| JsonRpcResponse::failure(id, err.code, err.message);

    let envelope: JsonRpcRequest = match serde_json::from_value(request) {
        Ok(envelope) => envelope,
        Err(e) => return failure(Value::Null, ApiError::invalid_request(e)),
    };
    if envelope.jsonrpc != JSONRPC_VERSION {
        return failure(envelope.id, ApiError::invalid_request("jsonrpc must be \"2.0\""));
    }
    if !envelope.id.is_string() && !envelope.id.is_number() {
        return failure(
            Value::Null,
            ApiError::invalid_request("id must be string or number"),
        );
    }

    let request = match envelope.to_request() {
        Ok(request) => request,
        Err(_) => return failure(envelope.id, ApiError::method_not_found(&envelope.method)),
    };

    match state.rpc.handle(request).await {
        Ok(result) => JsonRpcResponse::success(envelope.id, result),
        Err(err) => {
            warn!(method = %envelope.method, error = %err, "[ql-04] peer request failed");
            failure(envelope.id, err.into())
        }
    }
}

// =============================================================================
// OPERATOR TRIGGERS
// =============================================================================

fn outcome_response(operation: &str, result: Result<SyncOutcome, SyncError>) -> Response {
    match result {
        Ok(outcome) => (StatusCode::OK, outcome.to_string()).into_response(),
        Err(err) => {
            error!(operation, error = %err, "[ql-04] sync operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "message": "invalid" })),
            )
                .into_response()
        }
    }
}

async fn create_genesis(State(state): State<AppState>) -> Response {
    outcome_response("create_genesis", state.sync.create_genesis().await)
}

async fn sync_pool(State(state): State<AppState>) -> Response {
    outcome_response("sync_pool", state.sync.sync_pool().await)
}

async fn sync_blocks(State(state): State<AppState>) -> Response {
    outcome_response("sync_blocks", state.sync.sync_blocks_by_majority().await)
}

async fn full_resync(State(state): State<AppState>) -> Response {
    outcome_response("full_resync", state.sync.full_resync().await)
}

async fn resolve_forks(State(state): State<AppState>) -> Response {
    outcome_response("resolve_forks", state.sync.resolve_forks().await)
}

async fn audit_chain(State(state): State<AppState>) -> Response {
    outcome_response("audit_chain", state.sync.audit_chain().await)
}

async fn propagate_pool(State(state): State<AppState>) -> Response {
    outcome_response(
        "propagate_pool",
        state.sync.propagate_undelivered_pool().await,
    )
}

// =============================================================================
// PROBES
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "rpc-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics() -> Response {
    match ledger_telemetry::encode_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "[ql-04] metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
