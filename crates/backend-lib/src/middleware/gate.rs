// ============================
// crates/backend-lib/src/middleware/gate.rs
// ============================
//! Route authorization gate.
//!
//! Every request is matched against the ordered [`Policy`]. Public paths pass
//! straight through; anything else needs a session token that verifies and,
//! where the rule says so, a role it accepts. Verification failures are never
//! errors: they all end in the same deny response.
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use metrics::counter;
use tracing::{debug, info, warn};
use warden_common::Role;

use crate::auth::{SessionClaim, TokenError};
use crate::config::GateSettings;
use crate::error::AppError;
use crate::metrics::{GATE_ALLOW, GATE_DENY};
use crate::policy::{Decision, DenyReason, Policy, Presented};
use crate::AppState;

/// Verified claim attached to an allowed request.
///
/// Downstream handlers trust it as-is; the gate already checked it.
#[derive(Debug, Clone)]
pub struct SessionContext {
    claim: Arc<SessionClaim>,
}

impl SessionContext {
    pub fn new(claim: SessionClaim) -> Self {
        Self {
            claim: Arc::new(claim),
        }
    }

    pub fn claim(&self) -> &SessionClaim {
        &self.claim
    }

    pub fn user_id(&self) -> &str {
        &self.claim.sub
    }

    pub fn role(&self) -> Role {
        self.claim.role
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SessionContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}

/// `Option<SessionContext>` for public routes that adapt to a signed-in caller
impl<S: Send + Sync> OptionalFromRequestParts<S> for SessionContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<SessionContext>().cloned())
    }
}

/// Gate middleware, installed with `axum::middleware::from_fn_with_state`
pub async fn gate(State(state): State<Arc<AppState>>, mut request: Request, next: Next) -> Response {
    let policy: &Policy = &state.policy;
    let requirement = policy.requirement_for(request.uri().path());
    let token = extract_token(request.headers(), &state.settings.session.cookie_name)
        .map(str::to_owned);
    let now = Utc::now();

    if requirement.is_public() {
        // Best effort: public handlers may still want to know who is asking
        if let Some(claim) = token.and_then(|t| state.tokens.verify(&t, now).ok()) {
            request.extensions_mut().insert(SessionContext::new(claim));
        }
        return next.run(request).await;
    }

    let verified = token.map(|t| state.tokens.verify(&t, now));
    let presented = match &verified {
        None => Presented::Missing,
        Some(Err(e)) => Presented::Rejected(*e),
        Some(Ok(claim)) => Presented::Valid(claim),
    };

    match requirement.evaluate(presented) {
        Decision::Allow => {
            counter!(GATE_ALLOW).increment(1);
            if let Some(Ok(claim)) = verified {
                request.extensions_mut().insert(SessionContext::new(claim));
            }
            next.run(request).await
        },
        Decision::Deny(reason) => {
            counter!(GATE_DENY, "reason" => reason.as_str()).increment(1);
            log_denial(request.uri().path(), reason, verified.as_ref().and_then(|v| v.as_ref().ok()));
            deny_response(&state.settings.gate, request.headers(), reason)
        },
    }
}

fn log_denial(path: &str, reason: DenyReason, claim: Option<&SessionClaim>) {
    let reason_label = reason.as_str();
    match reason {
        DenyReason::MissingToken => debug!(path, reason = reason_label, "access denied"),
        DenyReason::InvalidToken(TokenError::Expired) => {
            info!(path, reason = reason_label, "access denied")
        },
        DenyReason::InvalidToken(_) => warn!(path, reason = reason_label, "access denied"),
        DenyReason::InsufficientRole => info!(
            path,
            reason = reason_label,
            user_id = claim.map(|c| c.sub.as_str()),
            role = claim.map(|c| c.role.as_str()),
            "access denied"
        ),
    }
}

/// Browsers get sent to the login page when one is configured; other clients
/// get 401 (no usable session) or 403 (session lacks the role).
fn deny_response(settings: &GateSettings, headers: &HeaderMap, reason: DenyReason) -> Response {
    if let Some(login) = &settings.login_redirect {
        if accepts_html(headers) {
            return Redirect::to(login).into_response();
        }
    }
    match reason {
        DenyReason::InsufficientRole => AppError::Forbidden.into_response(),
        _ => AppError::Unauthenticated.into_response(),
    }
}

fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// Session token from the named cookie, falling back to `Authorization: Bearer`
pub fn extract_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    cookie_value(headers, cookie_name).or_else(|| bearer_token(headers))
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
