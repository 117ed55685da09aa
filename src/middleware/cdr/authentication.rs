//! Bearer token → `CdrUser`, for endpoints that need consent.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::error::CdrRejection;
use crate::state::CdrState;

use super::context::{self, bearer_token};

pub async fn authenticate(
    State(state): State<CdrState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, CdrRejection> {
    let resolution = context::resolution(&state, &mut req);
    let requires_consent = resolution
        .endpoint()
        .is_some_and(|ep| ep.definition.required_scope().is_some());
    if !requires_consent {
        return Ok(next.run(req).await);
    }

    let token = bearer_token(req.headers())
        .ok_or_else(|| CdrRejection::Unauthorized("missing bearer token".into()))?;

    let user = match state.users.resolve(token).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(backend = state.users.backend_name(), "no user for access token");
            return Err(CdrRejection::Unauthorized("unknown or inactive token".into()));
        }
        Err(err) => {
            tracing::warn!(
                backend = state.users.backend_name(),
                error = %err,
                "user resolution failed"
            );
            return Err(CdrRejection::Unauthorized("invalid access token".into()));
        }
    };

    tracing::debug!(customer_id = %user.customer_id, "cdr user authenticated");
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::cdr::test_support::*;
    use crate::services::auth::CdrUser;
    use crate::services::auth::access_jwt::test_support::token_for;
    use axum::{Extension, Router, http::StatusCode, http::header, routing::get as get_route};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/cds-au/v1/banking/accounts",
                get_route(|Extension(user): Extension<CdrUser>| async move { user.customer_id }),
            )
            .route("/cds-au/v1/banking/products", get_route(|| async { "public" }))
            .layer(axum::middleware::from_fn_with_state(state(), authenticate))
    }

    #[tokio::test]
    async fn public_endpoint_needs_no_token() {
        let response = app()
            .oneshot(get("/cds-au/v1/banking/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_401_with_challenge() {
        let response = app()
            .oneshot(get("/cds-au/v1/banking/accounts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let errors = error_list(response).await;
        assert_eq!(
            errors.errors[0].code,
            "urn:au-cds:error:cds-all:Authorisation/Unauthorized"
        );
    }

    #[tokio::test]
    async fn unknown_subject_and_bad_token_are_401() {
        for token in [
            token_for("nobody", serde_json::json!("bank:accounts.basic:read")),
            "garbage".to_string(),
        ] {
            let response = app()
                .oneshot(
                    get("/cds-au/v1/banking/accounts")
                        .header("authorization", format!("Bearer {token}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn known_user_is_attached() {
        let token = token_for(JANE, serde_json::json!("bank:accounts.basic:read"));
        let response = app()
            .oneshot(
                get("/cds-au/v1/banking/accounts")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, JANE_CUSTOMER_ID);
    }
}
