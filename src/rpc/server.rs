//! RPC HTTP Server
//!
//! Axum-based HTTP server that accepts JSON-RPC requests on `POST /`.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::rpc::methods::{handle_request, JsonRpcRequest, JsonRpcResponse, RpcState};

/// Build the RPC router
pub fn router(state: Arc<RpcState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", post(handle_rpc))
        .layer(cors)
        .with_state(state)
}

/// Serve RPC on `addr` until `shutdown` resolves
pub async fn start_rpc_server<F>(
    state: Arc<RpcState>,
    addr: SocketAddr,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "RPC server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Handle incoming JSON-RPC requests
async fn handle_rpc(
    State(state): State<Arc<RpcState>>,
    Json(request): Json<JsonRpcRequest>,
) -> (StatusCode, Json<JsonRpcResponse>) {
    debug!(method = %request.method, "rpc call");
    let response = handle_request(&state, request).await;
    (StatusCode::OK, Json(response))
}
