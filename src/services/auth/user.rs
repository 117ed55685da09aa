use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authenticated CDR customer, with the resource ids they have consented to
/// share. Read-only to the middleware.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdrUser {
    /// Data holder's internal customer id.
    pub customer_id: String,
    /// Login the token `sub` maps to.
    #[serde(default)]
    pub login_id: Option<String>,
    #[serde(default)]
    pub accounts_banking: Vec<String>,
    #[serde(default)]
    pub accounts_energy: Vec<String>,
    #[serde(default)]
    pub energy_service_points: Vec<String>,
    #[serde(default)]
    pub banking_payees: Vec<String>,
    #[serde(default, alias = "scopes_supported")]
    pub scopes_supported: Option<Vec<String>>,
}

impl CdrUser {
    /// Lookup key: the login id when present, else the customer id.
    pub fn subject(&self) -> &str {
        self.login_id.as_deref().unwrap_or(&self.customer_id)
    }
}

#[derive(Debug, Error)]
pub enum UserResolveError {
    #[error("token rejected: {0}")]
    Token(#[from] super::access_jwt::AccessJwtError),
    #[error("introspection request failed: {0}")]
    Introspection(#[from] reqwest::Error),
    #[error("failed to read user directory {path}: {source}")]
    DirectoryIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid user directory json: {0}")]
    DirectoryJson(#[from] serde_json::Error),
}

/// "Who is calling?" Resolve a bearer token to the customer behind it.
///
/// `Ok(None)` means the token is well-formed but maps to no active customer;
/// `Err` is a collaborator failure. The middleware answers both with 401.
#[async_trait]
pub trait UserResolver: Send + Sync {
    fn backend_name(&self) -> &'static str;
    async fn resolve(&self, token: &str) -> Result<Option<CdrUser>, UserResolveError>;
}

/// In-memory customer directory keyed by subject.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: HashMap<String, CdrUser>,
}

impl UserDirectory {
    pub fn new(users: impl IntoIterator<Item = CdrUser>) -> Self {
        let users = users
            .into_iter()
            .map(|u| (u.subject().to_string(), u))
            .collect();
        Self { users }
    }

    pub fn from_json(json: &str) -> Result<Self, UserResolveError> {
        let users: Vec<CdrUser> = serde_json::from_str(json)?;
        Ok(Self::new(users))
    }

    /// Empty directory when no file is given.
    pub fn from_file(path: Option<&Path>) -> Result<Self, UserResolveError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json =
            std::fs::read_to_string(path).map_err(|source| UserResolveError::DirectoryIo {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&json)
    }

    pub fn get(&self, subject: &str) -> Option<&CdrUser> {
        self.users.get(subject)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_json_uses_camel_case_and_accepts_snake_scopes() {
        let directory = UserDirectory::from_json(
            r#"[
                {
                    "customerId": "c-1",
                    "loginId": "jane",
                    "accountsBanking": ["1234567"],
                    "energyServicePoints": ["sp-1"],
                    "scopes_supported": ["bank:accounts.basic:read"]
                },
                { "customerId": "c-2" }
            ]"#,
        )
        .unwrap();

        assert_eq!(directory.len(), 2);
        let jane = directory.get("jane").unwrap();
        assert_eq!(jane.customer_id, "c-1");
        assert_eq!(jane.accounts_banking, vec!["1234567"]);
        assert!(jane.accounts_energy.is_empty());
        assert_eq!(
            jane.scopes_supported.as_deref(),
            Some(&["bank:accounts.basic:read".to_string()][..])
        );

        // no login id: keyed by customer id, scopes undefined
        let other = directory.get("c-2").unwrap();
        assert_eq!(other.scopes_supported, None);
    }

    #[test]
    fn missing_directory_file_is_empty() {
        assert!(UserDirectory::from_file(None).unwrap().is_empty());
        assert!(matches!(
            UserDirectory::from_file(Some(Path::new("/nonexistent/users.json"))),
            Err(UserResolveError::DirectoryIo { .. })
        ));
    }
}
