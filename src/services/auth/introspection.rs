//! Token introspection (RFC 7662) against the CDR authorisation server.
//!
//! The authorisation server decides whether the token is active; the data
//! holder only maps the introspected subject to its own customer record.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::user::{CdrUser, UserDirectory, UserResolveError, UserResolver};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectionResponse {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub exp: Option<u64>,
}

pub struct IntrospectionUserResolver {
    client: Client,
    endpoint: Url,
    directory: UserDirectory,
}

impl IntrospectionUserResolver {
    pub fn new(endpoint: Url, directory: UserDirectory) -> Result<Self, UserResolveError> {
        Self::with_timeout(endpoint, directory, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        endpoint: Url,
        directory: UserDirectory,
        timeout: Duration,
    ) -> Result<Self, UserResolveError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            directory,
        })
    }

    /// `None` when the endpoint answers with a non-success status.
    async fn introspect(
        &self,
        token: &str,
    ) -> Result<Option<IntrospectionResponse>, UserResolveError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("token", token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "introspection endpoint rejected request");
            return Ok(None);
        }
        Ok(Some(response.json::<IntrospectionResponse>().await?))
    }
}

/// Map an introspection result onto a directory customer.
fn user_for(introspected: IntrospectionResponse, directory: &UserDirectory) -> Option<CdrUser> {
    if !introspected.active {
        return None;
    }
    let sub = introspected.sub?;
    let mut user = directory.get(&sub)?.clone();
    if let Some(scope) = introspected.scope {
        user.scopes_supported = Some(scope.split_whitespace().map(str::to_string).collect());
    }
    Some(user)
}

#[async_trait]
impl UserResolver for IntrospectionUserResolver {
    fn backend_name(&self) -> &'static str {
        "introspection"
    }

    async fn resolve(&self, token: &str) -> Result<Option<CdrUser>, UserResolveError> {
        let Some(introspected) = self.introspect(token).await? else {
            return Ok(None);
        };
        Ok(user_for(introspected, &self.directory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Form, Json, Router, routing::post};
    use std::collections::HashMap;

    fn directory() -> UserDirectory {
        UserDirectory::new([CdrUser {
            customer_id: "c-1".into(),
            login_id: Some("jane".into()),
            accounts_energy: vec!["acc-1".into()],
            ..Default::default()
        }])
    }

    fn response(active: bool, sub: Option<&str>, scope: Option<&str>) -> IntrospectionResponse {
        IntrospectionResponse {
            active,
            sub: sub.map(str::to_string),
            scope: scope.map(str::to_string),
            client_id: None,
            exp: None,
        }
    }

    #[test]
    fn inactive_token_has_no_user() {
        assert_eq!(user_for(response(false, Some("jane"), None), &directory()), None);
    }

    #[test]
    fn active_token_maps_subject_and_replaces_scopes() {
        let user = user_for(
            response(true, Some("jane"), Some("energy:accounts.basic:read openid")),
            &directory(),
        )
        .unwrap();
        assert_eq!(user.customer_id, "c-1");
        assert_eq!(
            user.scopes_supported,
            Some(vec![
                "energy:accounts.basic:read".to_string(),
                "openid".to_string()
            ])
        );
    }

    #[test]
    fn active_token_without_known_subject_has_no_user() {
        assert_eq!(user_for(response(true, None, None), &directory()), None);
        assert_eq!(user_for(response(true, Some("bob"), None), &directory()), None);
    }

    #[tokio::test]
    async fn posts_form_encoded_token() {
        let app = Router::new().route(
            "/introspect",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                let active = form.get("token").map(String::as_str) == Some("good-token");
                Json(serde_json::json!({ "active": active, "sub": "jane", "scope": "openid" }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let endpoint = Url::parse(&format!("http://{addr}/introspect")).unwrap();
        let resolver = IntrospectionUserResolver::new(endpoint, directory()).unwrap();

        let user = resolver.resolve("good-token").await.unwrap().unwrap();
        assert_eq!(user.customer_id, "c-1");
        assert_eq!(resolver.resolve("revoked").await.unwrap(), None);
    }

    #[tokio::test]
    async fn non_success_status_has_no_user() {
        let app = Router::new().route(
            "/introspect",
            post(|| async { axum::http::StatusCode::SERVICE_UNAVAILABLE }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let endpoint = Url::parse(&format!("http://{addr}/introspect")).unwrap();
        let resolver = IntrospectionUserResolver::new(endpoint, directory()).unwrap();
        assert_eq!(resolver.resolve("any").await.unwrap(), None);
    }
}
