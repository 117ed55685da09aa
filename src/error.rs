/*
 * Responsibility
 * - CDR 共通の error 表現 (code / title / detail) と ErrorList
 * - validator が返す終端レスポンス (CdrRejection) の IntoResponse 実装
 * - wire format: { "errors": [ { "code", "title", "detail" } ] }
 */
use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const URN_PREFIX: &str = "urn:au-cds:error:cds-all:";

/// Error codes emitted by the validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    HeaderMissing,
    HeaderInvalid,
    HeaderInvalidVersion,
    HeaderUnsupportedVersion,
    FieldMissing,
    FieldInvalid,
    ResourceNotFound,
    ResourceNotImplemented,
    ResourceInvalid,
    AuthorisationInvalidConsent,
    AuthorisationUnauthorized,
}

impl ErrorCode {
    /// The part of the URN after `urn:au-cds:error:cds-all:`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::HeaderMissing => "Header/Missing",
            Self::HeaderInvalid => "Header/Invalid",
            Self::HeaderInvalidVersion => "Header/InvalidVersion",
            Self::HeaderUnsupportedVersion => "Header/UnsupportedVersion",
            Self::FieldMissing => "Field/Missing",
            Self::FieldInvalid => "Field/Invalid",
            Self::ResourceNotFound => "Resource/NotFound",
            Self::ResourceNotImplemented => "Resource/NotImplemented",
            Self::ResourceInvalid => "Resource/Invalid",
            Self::AuthorisationInvalidConsent => "Authorisation/InvalidConsent",
            Self::AuthorisationUnauthorized => "Authorisation/Unauthorized",
        }
    }

    pub fn urn(&self) -> String {
        format!("{URN_PREFIX}{}", self.suffix())
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::HeaderMissing => "Missing Required Header",
            Self::HeaderInvalid => "Invalid Header",
            Self::HeaderInvalidVersion => "Invalid Version",
            Self::HeaderUnsupportedVersion => "Unsupported Version",
            Self::FieldMissing => "Missing required field",
            Self::FieldInvalid => "Invalid Field",
            Self::ResourceNotFound => "NotFound",
            Self::ResourceNotImplemented => "NotImplemented",
            Self::ResourceInvalid => "Invalid Resource",
            Self::AuthorisationInvalidConsent => "InvalidConsent",
            Self::AuthorisationUnauthorized => "Unauthorized",
        }
    }
}

/// One entry of a CDR error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdrError {
    pub code: String,
    pub title: String,
    pub detail: String,
}

impl CdrError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code: code.urn(),
            title: code.title().to_string(),
            detail: detail.into(),
        }
    }
}

/// Ordered error accumulator. Insertion order is the order rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorList {
    pub errors: Vec<CdrError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(code: ErrorCode, detail: impl Into<String>) -> Self {
        let mut list = Self::new();
        list.push(code, detail);
        list
    }

    pub fn push(&mut self, code: ErrorCode, detail: impl Into<String>) {
        self.errors.push(CdrError::new(code, detail));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

/// Terminal outcome of a validator.
///
/// Every variant renders the full `ErrorList` as the body; a validator never
/// mixes its list with another validator's.
#[derive(Debug, Error)]
pub enum CdrRejection {
    #[error("bad request ({} errors)", .0.len())]
    BadRequest(ErrorList),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden ({} errors)", .0.len())]
    Forbidden(ErrorList),
    #[error("not found ({} errors)", .0.len())]
    NotFound(ErrorList),
    #[error("not acceptable ({} errors)", .0.len())]
    NotAcceptable(ErrorList),
}

impl CdrRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
        }
    }

    /// Render with extra response headers (e.g. `x-v` on header failures).
    pub fn into_response_with(self, extra: HeaderMap) -> Response {
        let mut response = self.into_response();
        response.headers_mut().extend(extra);
        response
    }
}

impl IntoResponse for CdrRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Unauthorized(detail) => {
                let body = ErrorList::single(ErrorCode::AuthorisationUnauthorized, detail);
                let mut response = (status, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            Self::BadRequest(errors)
            | Self::Forbidden(errors)
            | Self::NotFound(errors)
            | Self::NotAcceptable(errors) => (status, Json(errors)).into_response(),
        }
    }
}
