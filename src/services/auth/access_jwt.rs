use std::str::FromStr;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

// Errors returned by access-token verification + claim validation.
#[derive(Debug, Error)]
pub enum AccessJwtError {
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("invalid public key pem: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
    #[error("unsupported access token algorithm '{0}'")]
    UnsupportedAlgorithm(String),
    #[error("empty '{0}' claim")]
    EmptyClaim(&'static str),
}

/// Signing algorithms accepted for CDR access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessJwtAlgorithm {
    #[default]
    EdDsa,
    Es256,
    Ps256,
}

impl AccessJwtAlgorithm {
    fn algorithm(self) -> Algorithm {
        match self {
            Self::EdDsa => Algorithm::EdDSA,
            Self::Es256 => Algorithm::ES256,
            Self::Ps256 => Algorithm::PS256,
        }
    }

    fn decoding_key(self, pem: &[u8]) -> Result<DecodingKey, AccessJwtError> {
        let key = match self {
            Self::EdDsa => DecodingKey::from_ed_pem(pem),
            Self::Es256 => DecodingKey::from_ec_pem(pem),
            Self::Ps256 => DecodingKey::from_rsa_pem(pem),
        };
        key.map_err(AccessJwtError::InvalidKey)
    }
}

impl FromStr for AccessJwtAlgorithm {
    type Err = AccessJwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EDDSA" | "ED25519" => Ok(Self::EdDsa),
            "ES256" => Ok(Self::Es256),
            "PS256" => Ok(Self::Ps256),
            other => Err(AccessJwtError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// `scope` claim: RFC 8693 space-separated string, or a JSON array as some
/// authorisation servers emit it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ScopeClaim {
    Text(String),
    List(Vec<String>),
}

impl ScopeClaim {
    pub fn into_scopes(self) -> Vec<String> {
        match self {
            Self::Text(s) => s.split_whitespace().map(str::to_string).collect(),
            Self::List(list) => list
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// Access token (JWT) claims used by the CDR chain.
///
/// NOTE:
/// - `aud` may be a string or an array; jsonwebtoken validates it via `Validation::set_audience`.
/// - `scopes` is accepted as an alternative spelling of `scope`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenClaims {
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: serde_json::Value,

    pub sub: String,
    pub exp: u64,

    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub software_id: Option<String>,

    #[serde(default, alias = "scopes")]
    pub scope: Option<ScopeClaim>,
}

impl AccessTokenClaims {
    /// Granted scopes, or `None` when the token carries no scope claim.
    pub fn scopes(&self) -> Option<Vec<String>> {
        self.scope.clone().map(ScopeClaim::into_scopes)
    }
}

/// `decode(token) -> claims`. Implementations must not panic on garbage input.
pub trait ClaimsDecoder: Send + Sync {
    fn decode(&self, token: &str) -> Result<AccessTokenClaims, AccessJwtError>;
}

/// jsonwebtoken-backed decoder.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct JwtClaimsDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtClaimsDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtClaimsDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtClaimsDecoder {
    pub fn new(
        public_key_pem: &str,
        algorithm: AccessJwtAlgorithm,
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Result<Self, AccessJwtError> {
        let decoding_key = algorithm.decoding_key(public_key_pem.as_bytes())?;

        let mut validation = Validation::new(algorithm.algorithm());
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.leeway = leeway_seconds;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    #[cfg(test)]
    pub(crate) fn hs256(secret: &[u8], issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.leeway = 0;
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl ClaimsDecoder for JwtClaimsDecoder {
    /// Signature, `exp`, `iss` and `aud` are checked by jsonwebtoken; `sub`
    /// must additionally be non-empty.
    fn decode(&self, token: &str) -> Result<AccessTokenClaims, AccessJwtError> {
        let data =
            jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AccessJwtError::EmptyClaim("sub"));
        }
        Ok(claims)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::{SystemTime, UNIX_EPOCH};

    use jsonwebtoken::{EncodingKey, Header};

    pub const SECRET: &[u8] = b"test-secret-for-cdr-middleware-0123456789";
    pub const ISSUER: &str = "https://auth.example.com";
    pub const AUDIENCE: &str = "https://dh.example.com";

    pub fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    pub fn token(claims: serde_json::Value) -> String {
        jsonwebtoken::encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    pub fn token_for(sub: &str, scope: serde_json::Value) -> String {
        token(serde_json::json!({
            "iss": ISSUER,
            "aud": AUDIENCE,
            "sub": sub,
            "exp": now() + 600,
            "scope": scope,
        }))
    }
}
