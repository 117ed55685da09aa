//! Endpoint existence: is this a CDR endpoint, and does this deployment
//! implement it?

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::error::{CdrRejection, ErrorCode, ErrorList};
use crate::resolver::Resolution;
use crate::state::CdrState;

use super::context;
use super::headers::X_V;

pub(crate) const NOT_A_CDR_ENDPOINT: &str = "This endpoint is not a CDR endpoint";
pub(crate) const NOT_IMPLEMENTED: &str = "This endpoint has not been implemented";

pub async fn validate_endpoint(
    State(state): State<CdrState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, CdrRejection> {
    if !state.options.specified_endpoints_only {
        return Ok(next.run(req).await);
    }

    match context::resolution(&state, &mut req) {
        Resolution::Implemented(_) => Ok(next.run(req).await),
        Resolution::NotImplemented(ep) => {
            tracing::warn!(
                endpoint = %ep.definition.path_template(),
                "cdr endpoint not implemented"
            );
            let mut echo = HeaderMap::new();
            echo.insert(
                X_V,
                HeaderValue::from(ep.definition.max_supported_version()),
            );
            Ok(CdrRejection::NotFound(ErrorList::single(
                ErrorCode::ResourceNotImplemented,
                NOT_IMPLEMENTED,
            ))
            .into_response_with(echo))
        }
        Resolution::NotFound => {
            tracing::warn!(path = %req.uri().path(), "not a cdr endpoint");
            Err(CdrRejection::NotFound(ErrorList::single(
                ErrorCode::ResourceNotFound,
                NOT_A_CDR_ENDPOINT,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::cdr::test_support::*;
    use crate::state::CdrOptions;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn implemented_endpoint_passes() {
        let app = guarded!(state(), validate_endpoint);
        let response = app
            .oneshot(get("/cds-au/v1/energy/plans").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_endpoint_is_404_not_found() {
        let app = guarded!(state(), validate_endpoint);
        let response = app
            .oneshot(get("/cds-au/v1/energy/all-customer").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(X_V).is_none());

        let errors = error_list(response).await;
        assert_eq!(errors.errors.len(), 1);
        assert_eq!(
            errors.errors[0].code,
            "urn:au-cds:error:cds-all:Resource/NotFound"
        );
        assert_eq!(errors.errors[0].title, "NotFound");
        assert_eq!(errors.errors[0].detail, NOT_A_CDR_ENDPOINT);
    }

    #[tokio::test]
    async fn unimplemented_endpoint_is_404_not_implemented() {
        let state = state_with_configured(
            r#"[{"requestType":"GET","requestPath":"/energy/electricity/servicepoints"}]"#,
            CdrOptions::default(),
        );
        let app = guarded!(state, validate_endpoint);
        let response = app
            .oneshot(
                get("/cds-au/v1/energy/electricity/servicepoints/3456777")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[X_V], "1");

        let errors = error_list(response).await;
        assert_eq!(
            errors.errors[0].code,
            "urn:au-cds:error:cds-all:Resource/NotImplemented"
        );
        assert_eq!(errors.errors[0].detail, NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn missing_base_path_is_not_found() {
        let state = state_with_base_path("/prod-data", CdrOptions::default());
        let app = guarded!(state, validate_endpoint);
        let response = app
            .oneshot(get("/energy/electricity/servicepoints").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lenient_mode_passes_everything() {
        let options = CdrOptions {
            specified_endpoints_only: false,
            ..CdrOptions::default()
        };
        let app = guarded!(state_with_options(options), validate_endpoint);
        let response = app
            .oneshot(get("/cds-au/v1/energy/all-customer").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
