// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.

pub mod credentials;
pub mod session;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap, StatusCode},
};

use crate::error::AppError;
use crate::AppState;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Key the login rate limiter buckets the caller under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl FromRequestParts<Arc<AppState>> for ClientKey {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientKey(client_key(
            &parts.headers,
            peer,
            state.settings.server.trust_forwarded_headers,
        )))
    }
}

/// Peer IP of the connection, or the proxy-reported address when forwarded
/// headers are trusted. `"unknown"` only when served without connect info.
pub(crate) fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    trust_forwarded
        .then(|| forwarded_ip(headers))
        .flatten()
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.split(',').next())
        })
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
}

/// Malformed JSON bodies are reported as invalid input without parser detail
pub(crate) fn bad_body(rejection: axum::extract::rejection::JsonRejection) -> AppError {
    AppError::InvalidInput(rejection.body_text())
}
