//! Bearer-token middleware for the ingress routes.
//!
//! The gateway authenticates to the agent with a shared token configured in
//! `AGENT_INGRESS_TOKEN`. Only an HMAC tag keyed by the expected token is
//! kept; a presented token is checked by verifying that tag with
//! `ring::hmac::verify`, which compares in constant time.

use crate::errors::AgentError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use common::secret::{ExposeSecret, SecretString};
use ring::hmac;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Message signed with the expected token.
const INGRESS_TAG_CONTEXT: &[u8] = b"voice-agent ingress token";

/// State for the ingress auth middleware.
pub struct IngressAuth {
    /// HMAC-SHA256 of the context, keyed by the token the gateway must present.
    expected: hmac::Tag,
}

impl fmt::Debug for IngressAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngressAuth")
            .field("expected", &"[REDACTED]")
            .finish()
    }
}

impl IngressAuth {
    #[must_use]
    pub fn new(token: SecretString) -> Self {
        let key = hmac::Key::new(hmac::HMAC_SHA256, token.expose_secret().as_bytes());
        Self {
            expected: hmac::sign(&key, INGRESS_TAG_CONTEXT),
        }
    }

    fn matches(&self, presented: &str) -> bool {
        let key = hmac::Key::new(hmac::HMAC_SHA256, presented.as_bytes());
        hmac::verify(&key, INGRESS_TAG_CONTEXT, self.expected.as_ref()).is_ok()
    }
}

/// Reject ingress requests without the shared bearer token.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// Returns 401 with a `WWW-Authenticate` header when the token is missing or
/// wrong.
#[instrument(skip_all, name = "va.gateway.auth")]
pub async fn require_ingress_token(
    State(auth): State<Arc<IngressAuth>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, AgentError> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "va.gateway.auth", "Missing Authorization header");
            AgentError::Unauthorized("Missing Authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "va.gateway.auth", "Invalid Authorization header format");
        AgentError::Unauthorized("Invalid Authorization header format".to_string())
    })?;

    if !auth.matches(token) {
        tracing::warn!(target: "va.gateway.auth", "Ingress token rejected");
        return Err(AgentError::Unauthorized("Invalid token".to_string()));
    }

    Ok(next.run(req).await)
}
