// ============================
// crates/backend-lib/src/handlers/credentials.rs
// ============================
//! Stateless hash and verify endpoints.
use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use metrics::counter;
use tracing::instrument;
use warden_common::{HashRequest, HashResponse, VerifyRequest, VerifyResponse};
use zeroize::Zeroizing;

use super::bad_body;
use crate::auth::PasswordError;
use crate::error::AppError;
use crate::metrics::{AUTH_HASH, AUTH_VERIFY};
use crate::AppState;

/// `POST /api/hash`
#[instrument(skip_all)]
pub async fn hash(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<HashRequest>, JsonRejection>,
) -> Result<Json<HashResponse>, AppError> {
    let Json(request) = payload.map_err(bad_body)?;
    let secret = Zeroizing::new(request.secret.unwrap_or_default());
    if secret.is_empty() {
        return Err(PasswordError::InvalidInput.into());
    }

    let hasher = Arc::clone(&state.hasher);
    let hash = state.workers.run(move || hasher.hash(&secret)).await??;

    counter!(AUTH_HASH).increment(1);
    Ok(Json(HashResponse { hash }))
}

/// `POST /api/verify`
///
/// A mismatch is a successful response with `matches: false`.
#[instrument(skip_all)]
pub async fn verify(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let Json(request) = payload.map_err(bad_body)?;
    let secret = Zeroizing::new(request.secret.unwrap_or_default());
    if secret.is_empty() {
        return Err(PasswordError::InvalidInput.into());
    }
    let stored = request
        .hash
        .ok_or_else(|| AppError::InvalidInput("missing hash".into()))?;

    let hasher = Arc::clone(&state.hasher);
    let matches = state
        .workers
        .run(move || hasher.verify(&secret, &stored))
        .await??;

    counter!(AUTH_VERIFY, "matches" => if matches { "true" } else { "false" }).increment(1);
    Ok(Json(VerifyResponse { matches }))
}
