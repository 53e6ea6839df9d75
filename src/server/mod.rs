//! HTTP and WebSocket surface
//!
//! - `GET /` liveness banner
//! - `GET /api-usage` usage report
//! - `GET /ws` viewer push channel

mod handlers;

use std::future::Future;
use std::net::SocketAddr;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::broadcast::Broadcaster;
use crate::error::{Error, Result};
use crate::ledger::UsageReporter;
use crate::scheduler::ConversationHandle;

pub use handlers::BANNER;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub broadcaster: Broadcaster,
    pub reporter: UsageReporter,
    pub conversation: ConversationHandle,
}

/// Build the router with all endpoints.
pub fn router(state: AppState, cors_any_origin: bool) -> Router {
    let router = Router::new()
        .route("/", get(handlers::banner_handler))
        .route("/api-usage", get(handlers::api_usage_handler))
        .route("/ws", get(handlers::ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_any_origin {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST]),
        )
    } else {
        router
    }
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Bind { addr, source: e })
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Listening for viewers");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Server(e.to_string()))
}
