//! Consent check: the caller's scopes must contain the endpoint's required
//! scope (exact, case-sensitive).
//!
//! Scopes come from the access token (`GrantedScopes`) when present, else
//! from the authenticated user's `scopesSupported`. When neither exists the
//! configured `MissingScopesPolicy` decides.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::error::{CdrRejection, ErrorCode, ErrorList};
use crate::services::auth::CdrUser;
use crate::state::{CdrState, MissingScopesPolicy};

use super::context::{self, GrantedScopes, bearer_token};

fn invalid_consent() -> CdrRejection {
    CdrRejection::Forbidden(ErrorList::single(
        ErrorCode::AuthorisationInvalidConsent,
        "Invalid scope",
    ))
}

pub async fn validate_scope(
    State(state): State<CdrState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, CdrRejection> {
    let resolution = context::resolution(&state, &mut req);
    let Some(required) = resolution
        .endpoint()
        .and_then(|ep| ep.definition.required_scope())
    else {
        return Ok(next.run(req).await);
    };

    if bearer_token(req.headers()).is_none() {
        return Err(CdrRejection::Unauthorized("missing bearer token".into()));
    }
    let Some(user) = req.extensions().get::<CdrUser>() else {
        return Err(CdrRejection::Unauthorized("no authenticated user".into()));
    };

    // None: scopes undefined.
    let granted = match req.extensions().get::<GrantedScopes>() {
        Some(scopes) => Some(scopes.contains(required)),
        None => user
            .scopes_supported
            .as_ref()
            .map(|scopes| scopes.iter().any(|s| s == required)),
    };

    match (granted, state.options.missing_scopes) {
        (Some(true), _) => Ok(next.run(req).await),
        (Some(false), _) => {
            tracing::warn!(required, "required scope not granted");
            Err(invalid_consent())
        }
        (None, MissingScopesPolicy::Allow) => {
            tracing::debug!(required, "caller scopes undefined; allowed by policy");
            Ok(next.run(req).await)
        }
        (None, MissingScopesPolicy::Deny) => {
            tracing::warn!(required, "caller scopes undefined");
            Err(invalid_consent())
        }
    }
}
