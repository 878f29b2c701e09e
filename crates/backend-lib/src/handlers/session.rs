// ============================
// crates/backend-lib/src/handlers/session.rs
// ============================
//! Registration, login, logout and the current-session endpoint.
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use tracing::instrument;
use warden_common::{CredentialsRequest, SessionResponse, SessionView};
use zeroize::Zeroizing;

use super::{bad_body, ClientKey};
use crate::auth::IssuedSession;
use crate::config::SessionSettings;
use crate::error::AppError;
use crate::middleware::SessionContext;
use crate::AppState;

/// `POST /api/register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(bad_body)?;
    let identity = request.identity.unwrap_or_default();
    let secret = Zeroizing::new(request.secret.unwrap_or_default());

    let session = state.auth.register(&identity, secret, Utc::now()).await?;
    session_response(&state.settings.session, session, StatusCode::CREATED)
}

/// `POST /api/login`
#[instrument(skip_all, fields(client = tracing::field::Empty))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientKey(client): ClientKey,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(bad_body)?;
    tracing::Span::current().record("client", client.as_str());
    let identity = request.identity.unwrap_or_default();
    let secret = Zeroizing::new(request.secret.unwrap_or_default());

    let session = state.auth.login(&client, &identity, secret, Utc::now()).await?;
    session_response(&state.settings.session, session, StatusCode::OK)
}

/// `POST /api/logout`
///
/// Tokens are self-contained, so this only drops the cookie; a copied token
/// stays valid until it expires.
pub async fn logout(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let cookie = session_cookie(&state.settings.session, "", 0)?;
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response())
}

/// `GET /api/session`
pub async fn current(session: SessionContext) -> Json<SessionView> {
    Json(session.claim().view())
}

fn session_response(
    settings: &SessionSettings,
    session: IssuedSession,
    status: StatusCode,
) -> Result<Response, AppError> {
    let max_age = (session.claim.exp - session.claim.iat).num_seconds();
    let cookie = session_cookie(settings, &session.token, max_age)?;
    let body = SessionResponse {
        identity: session.identity,
        session: session.claim.view(),
    };
    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

fn session_cookie(
    settings: &SessionSettings,
    token: &str,
    max_age: i64,
) -> Result<HeaderValue, AppError> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        settings.cookie_name, token, max_age
    );
    if settings.secure_cookie {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|e| AppError::Internal(format!("session cookie: {e}")))
}
