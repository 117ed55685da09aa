//! Bearer token → `GrantedScopes`.
//!
//! Never rejects: a missing or undecodable token simply leaves the scopes
//! undefined for the validators downstream.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::state::CdrState;

use super::context::{GrantedScopes, bearer_token};

pub async fn attach_jwt_scopes(
    State(state): State<CdrState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(req.headers()) else {
        return next.run(req).await;
    };

    match state.decoder.decode(token) {
        Ok(claims) => {
            if let Some(scopes) = claims.scopes() {
                tracing::debug!(scopes = scopes.len(), "scopes read from access token");
                req.extensions_mut().insert(GrantedScopes(scopes));
            }
        }
        Err(err) => {
            tracing::debug!(error = %err, "access token not decodable; scopes left undefined");
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::cdr::test_support::*;
    use crate::services::auth::access_jwt::test_support::token_for;
    use axum::{Extension, Router, routing::get as get_route};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/cds-au/v1/energy/accounts",
                get_route(|scopes: Option<Extension<GrantedScopes>>| async move {
                    match scopes {
                        Some(Extension(GrantedScopes(scopes))) => scopes.join(","),
                        None => "undefined".to_string(),
                    }
                }),
            )
            .layer(axum::middleware::from_fn_with_state(state(), attach_jwt_scopes))
    }

    async fn scopes_seen(request: Request<Body>) -> String {
        body_text(app().oneshot(request).await.unwrap()).await
    }

    #[tokio::test]
    async fn string_scope_claim_is_split() {
        let token = token_for(
            "jane",
            serde_json::json!("energy:accounts.basic:read openid"),
        );
        let seen = scopes_seen(
            get("/cds-au/v1/energy/accounts")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(seen, "energy:accounts.basic:read,openid");
    }

    #[tokio::test]
    async fn list_scope_claim_is_used_as_is() {
        let token = token_for("jane", serde_json::json!(["energy:billing:read"]));
        let seen = scopes_seen(
            get("/cds-au/v1/energy/accounts")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(seen, "energy:billing:read");
    }

    #[tokio::test]
    async fn missing_or_corrupt_token_leaves_scopes_undefined() {
        let seen = scopes_seen(get("/cds-au/v1/energy/accounts").body(Body::empty()).unwrap()).await;
        assert_eq!(seen, "undefined");

        let seen = scopes_seen(
            get("/cds-au/v1/energy/accounts")
                .header("authorization", "Bearer not.a.jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(seen, "undefined");
    }
}
