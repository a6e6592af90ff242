mod auth;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use engine::BotController;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    /// The one controller instance, constructed at startup and shared here
    /// by reference; handlers only call `start`/`stop`/`status` on it.
    pub controller: Arc<BotController>,
    /// Bearer token for the control routes. Auth is disabled when `None`.
    pub api_token: Option<String>,
}

/// Build and run the axum control server.
pub async fn serve(state: AppState, port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    let app = Router::new()
        .merge(routes::control_router(state.clone()))
        .merge(routes::health_router())
        .with_state(state)
        .layer(cors);

    info!(%addr, "Control API listening");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
