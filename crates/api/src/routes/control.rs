use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use common::BotStatus;

use crate::{auth::require_auth, AppState};

pub fn control_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/start", post(post_start))
        .route("/stop", post(post_stop))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// Advisory snapshot of the bot: running flag, balances, trade log, and the
/// last recorded signal.
async fn get_status(State(state): State<AppState>) -> Json<BotStatus> {
    Json(state.controller.status().await)
}

async fn post_start(State(state): State<AppState>) -> Json<Value> {
    let running = state.controller.start().await;
    Json(json!({ "message": "Bot started", "status": running }))
}

async fn post_stop(State(state): State<AppState>) -> Json<Value> {
    let running = state.controller.stop().await;
    Json(json!({ "message": "Bot stopped", "status": running }))
}
