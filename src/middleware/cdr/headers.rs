//! CDR request headers: `x-v`, `x-min-v`, `x-fapi-interaction-id`.
//!
//! The response advertises the endpoint's maximum supported version in `x-v`
//! and echoes (or generates) the interaction id, on failures too.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::{CdrRejection, ErrorCode, ErrorList};
use crate::state::CdrState;

use super::context::{self, NegotiatedVersion};
use super::endpoint::NOT_A_CDR_ENDPOINT;

pub const X_V: HeaderName = HeaderName::from_static("x-v");
pub const X_MIN_V: HeaderName = HeaderName::from_static("x-min-v");
pub const X_FAPI_INTERACTION_ID: HeaderName = HeaderName::from_static("x-fapi-interaction-id");

#[derive(Debug, PartialEq, Eq)]
enum VersionHeader {
    Absent,
    Valid(u32),
    Invalid,
}

/// `^[1-9]\d*$`; values past `u32` saturate.
fn version_header(headers: &HeaderMap, name: &HeaderName) -> VersionHeader {
    let Some(value) = headers.get(name) else {
        return VersionHeader::Absent;
    };
    let Ok(text) = value.to_str() else {
        return VersionHeader::Invalid;
    };
    let text = text.trim();
    let canonical = !text.is_empty()
        && !text.starts_with('0')
        && text.bytes().all(|b| b.is_ascii_digit());
    if !canonical {
        return VersionHeader::Invalid;
    }
    // Canonical but beyond u32: above every supported range.
    VersionHeader::Valid(text.parse::<u32>().unwrap_or(u32::MAX))
}

/// Hyphenated, version 4.
fn is_v4_uuid(value: &str) -> bool {
    value.len() == 36
        && Uuid::parse_str(value)
            .map(|id| id.get_version() == Some(uuid::Version::Random))
            .unwrap_or(false)
}

pub async fn validate_headers(
    State(state): State<CdrState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let resolution = context::resolution(&state, &mut req);
    let Some(ep) = resolution.endpoint() else {
        if state.options.specified_endpoints_only {
            return CdrRejection::NotFound(ErrorList::single(
                ErrorCode::ResourceNotFound,
                NOT_A_CDR_ENDPOINT,
            ))
            .into_response();
        }
        return next.run(req).await;
    };
    let definition = &ep.definition;
    let min_supported = definition.min_supported_version();
    let max_supported = definition.max_supported_version();

    let mut errors = ErrorList::new();
    let mut echo = HeaderMap::new();
    echo.insert(X_V, HeaderValue::from(max_supported));

    let requested = match version_header(req.headers(), &X_V) {
        VersionHeader::Valid(v) => Some(v),
        VersionHeader::Absent => {
            errors.push(ErrorCode::HeaderMissing, X_V.as_str());
            None
        }
        VersionHeader::Invalid => {
            errors.push(ErrorCode::HeaderInvalidVersion, X_V.as_str());
            None
        }
    };
    let min_requested = match version_header(req.headers(), &X_MIN_V) {
        VersionHeader::Valid(v) => Some(v),
        VersionHeader::Absent => None,
        VersionHeader::Invalid => {
            errors.push(ErrorCode::HeaderInvalidVersion, X_MIN_V.as_str());
            None
        }
    };

    let interaction_id = match req.headers().get(&X_FAPI_INTERACTION_ID) {
        None => {
            let generated = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok();
            if let Some(value) = &generated {
                tracing::debug!(
                    endpoint = %definition.path_template(),
                    declared_required = definition.requires_interaction_id(),
                    "interaction id generated"
                );
                req.headers_mut()
                    .insert(X_FAPI_INTERACTION_ID, value.clone());
            }
            generated
        }
        Some(value) if value.to_str().map(is_v4_uuid).unwrap_or(false) => Some(value.clone()),
        Some(_) => {
            errors.push(ErrorCode::HeaderInvalid, X_FAPI_INTERACTION_ID.as_str());
            None
        }
    };
    if let Some(value) = &interaction_id {
        echo.insert(X_FAPI_INTERACTION_ID, value.clone());
    }

    let requested = match requested {
        Some(requested) if errors.is_empty() => requested,
        _ => {
            tracing::warn!(
                endpoint = %definition.path_template(),
                errors = errors.len(),
                "cdr header validation failed"
            );
            return CdrRejection::BadRequest(errors).into_response_with(echo);
        }
    };

    // A minimum above the requested version is meaningless; clamp it.
    let min_requested = min_requested.unwrap_or(requested).min(requested);

    if requested < min_supported || min_requested > max_supported {
        tracing::warn!(
            endpoint = %definition.path_template(),
            requested,
            min_requested,
            "unsupported cdr version requested"
        );
        let detail = format!("minimum version: {min_supported}, maximum version: {max_supported}");
        return CdrRejection::NotAcceptable(ErrorList::single(
            ErrorCode::HeaderUnsupportedVersion,
            detail,
        ))
        .into_response_with(echo);
    }

    req.extensions_mut()
        .insert(NegotiatedVersion(requested.min(max_supported)));

    let mut response = next.run(req).await;
    for (name, value) in echo {
        if let Some(name) = name {
            response.headers_mut().entry(name).or_insert(value);
        }
    }
    response
}
