//! Typed request extensions shared between the CDR validators.
//!
//! Upstream validators enrich the request; downstream ones read. Nothing here
//! outlives the request.

use axum::{
    body::Body,
    extract::OriginalUri,
    http::{HeaderMap, Request, header},
};

use crate::resolver::Resolution;
use crate::state::CdrState;

/// Scopes granted by the caller's access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantedScopes(pub Vec<String>);

impl GrantedScopes {
    pub fn contains(&self, scope: &str) -> bool {
        self.0.iter().any(|s| s == scope)
    }
}

/// Version the handler should respond with: `min(x-v, maxSupportedVersion)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedVersion(pub u32);

/// Resolve the request once and memoize the result in its extensions.
///
/// Uses `OriginalUri` when present so a nested router still sees the full
/// path including the base path.
pub(crate) fn resolution(state: &CdrState, req: &mut Request<Body>) -> Resolution {
    if let Some(resolution) = req.extensions().get::<Resolution>() {
        return resolution.clone();
    }

    let target = match req.extensions().get::<OriginalUri>() {
        Some(OriginalUri(uri)) => uri.to_string(),
        None => req.uri().to_string(),
    };
    let resolution = state
        .resolver
        .resolve(req.method(), &target, &state.catalog);
    tracing::debug!(
        method = %req.method(),
        path = %target,
        resolution = resolution_kind(&resolution),
        "cdr endpoint resolved"
    );

    req.extensions_mut().insert(resolution.clone());
    resolution
}

fn resolution_kind(resolution: &Resolution) -> &'static str {
    match resolution {
        Resolution::Implemented(_) => "implemented",
        Resolution::NotImplemented(_) => "not_implemented",
        Resolution::NotFound => "not_found",
    }
}

/// Token from `Authorization: Bearer <token>`; the scheme is matched
/// case-insensitively.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer   abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwdw==")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn granted_scopes_membership_is_exact() {
        let scopes = GrantedScopes(vec!["energy:billing:read".into()]);
        assert!(scopes.contains("energy:billing:read"));
        assert!(!scopes.contains("Energy:Billing:Read"));
        assert!(!scopes.contains("energy:billing"));
    }
}
