use std::sync::Arc;

use async_trait::async_trait;

use super::access_jwt::ClaimsDecoder;
use super::user::{CdrUser, UserDirectory, UserResolveError, UserResolver};

/// Verifies the token locally and looks its `sub` up in the directory.
///
/// A `scope` claim on the token takes precedence over the directory's
/// `scopesSupported` for that request.
pub struct DirectoryUserResolver {
    decoder: Arc<dyn ClaimsDecoder>,
    directory: UserDirectory,
}

impl DirectoryUserResolver {
    pub fn new(decoder: Arc<dyn ClaimsDecoder>, directory: UserDirectory) -> Self {
        Self { decoder, directory }
    }
}

#[async_trait]
impl UserResolver for DirectoryUserResolver {
    fn backend_name(&self) -> &'static str {
        "directory"
    }

    async fn resolve(&self, token: &str) -> Result<Option<CdrUser>, UserResolveError> {
        let claims = self.decoder.decode(token)?;
        let Some(user) = self.directory.get(&claims.sub) else {
            tracing::debug!(sub = %claims.sub, "token subject not in user directory");
            return Ok(None);
        };

        let mut user = user.clone();
        if let Some(scopes) = claims.scopes() {
            user.scopes_supported = Some(scopes);
        }
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::access_jwt::{JwtClaimsDecoder, test_support::*};

    fn resolver() -> DirectoryUserResolver {
        let directory = UserDirectory::new([CdrUser {
            customer_id: "c-1".into(),
            login_id: Some("jane".into()),
            accounts_banking: vec!["1234567".into()],
            scopes_supported: Some(vec!["bank:accounts.basic:read".into()]),
            ..Default::default()
        }]);
        DirectoryUserResolver::new(
            Arc::new(JwtClaimsDecoder::hs256(SECRET, ISSUER, AUDIENCE)),
            directory,
        )
    }

    #[tokio::test]
    async fn known_subject_resolves_with_token_scopes() {
        let token = token_for("jane", serde_json::json!("bank:transactions:read"));
        let user = resolver().resolve(&token).await.unwrap().unwrap();
        assert_eq!(user.customer_id, "c-1");
        assert_eq!(
            user.scopes_supported,
            Some(vec!["bank:transactions:read".to_string()])
        );
    }

    #[tokio::test]
    async fn token_without_scope_keeps_directory_scopes() {
        let token = token(serde_json::json!({
            "iss": ISSUER,
            "aud": AUDIENCE,
            "sub": "jane",
            "exp": now() + 600,
        }));
        let user = resolver().resolve(&token).await.unwrap().unwrap();
        assert_eq!(
            user.scopes_supported,
            Some(vec!["bank:accounts.basic:read".to_string()])
        );
    }

    #[tokio::test]
    async fn unknown_subject_is_none_and_bad_token_is_error() {
        let token = token_for("nobody", serde_json::json!("openid"));
        assert_eq!(resolver().resolve(&token).await.unwrap(), None);

        assert!(matches!(
            resolver().resolve("garbage").await,
            Err(UserResolveError::Token(_))
        ));
    }
}
