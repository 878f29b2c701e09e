// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router: credential/session endpoints behind the authorization gate.
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, credentials, session};
use crate::middleware::gate;
use crate::AppState;

/// Router with only the built-in endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    create_router_with(state, Router::new())
}

/// Router with the built-in endpoints plus the host application's routes.
///
/// Every route, including `app`'s and the fallback, sits behind the gate, so
/// handlers in `app` can take a [`SessionContext`](crate::middleware::SessionContext)
/// on paths the policy protects.
pub fn create_router_with(state: Arc<AppState>, app: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/hash", post(credentials::hash))
        .route("/api/verify", post(credentials::verify))
        .route("/api/register", post(session::register))
        .route("/api/login", post(session::login))
        .route("/api/logout", post(session::logout))
        .route("/api/session", get(session::current))
        .merge(app)
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(Arc::clone(&state), gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
