/*
 * Responsibility
 * - 環境変数の読み込み (CDR catalog / strict mode / auth backend / JWT 検証鍵など)
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 * - library 側の CdrOptions への変換
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

use crate::services::auth::AccessJwtAlgorithm;
use crate::state::{CdrOptions, MissingScopesPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Where the authenticated `CdrUser` comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Verify the JWT locally and look `sub` up in the user directory.
    Directory,
    /// Ask the authorisation server (RFC 7662) at this URL.
    Introspection(Url),
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub base_path: String,
    pub endpoints_file: Option<PathBuf>,
    pub specified_endpoints_only: bool,
    pub missing_scopes: MissingScopesPolicy,
    pub body_limit_bytes: usize,

    pub auth_mode: AuthMode,
    pub users_file: Option<PathBuf>,

    pub auth_issuer: String,
    pub auth_audience: String,
    pub access_jwt_public_key_pem: String,
    pub access_jwt_algorithm: AccessJwtAlgorithm,
    pub access_token_leeway_seconds: u64,
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match optional(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid(key)),
        },
    }
}

fn parse_missing_scopes(value: Option<String>) -> Result<MissingScopesPolicy, ConfigError> {
    match value.map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("deny") => Ok(MissingScopesPolicy::Deny),
        Some("allow") => Ok(MissingScopesPolicy::Allow),
        Some(_) => Err(ConfigError::Invalid("CDR_MISSING_SCOPES")),
    }
}

fn parse_auth_mode(mode: Option<String>, url: Option<String>) -> Result<AuthMode, ConfigError> {
    match mode.map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("directory") => Ok(AuthMode::Directory),
        Some("introspection") => {
            let url = url.ok_or(ConfigError::Missing("AUTH_INTROSPECTION_URL"))?;
            let url = Url::parse(&url).map_err(|_| ConfigError::Invalid("AUTH_INTROSPECTION_URL"))?;
            Ok(AuthMode::Introspection(url))
        }
        Some(_) => Err(ConfigError::Invalid("AUTH_MODE")),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        // Set but empty disables the base path.
        let base_path = std::env::var("CDR_BASE_PATH")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|_| "/cds-au/v1".to_string());

        let endpoints_file = optional("CDR_ENDPOINTS_FILE").map(PathBuf::from);

        let specified_endpoints_only = parse_bool("CDR_SPECIFIED_ENDPOINTS_ONLY", true)?;

        let missing_scopes = parse_missing_scopes(optional("CDR_MISSING_SCOPES"))?;

        let body_limit_bytes = match optional("CDR_BODY_LIMIT_BYTES") {
            None => 1024 * 1024,
            Some(v) => v
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid("CDR_BODY_LIMIT_BYTES"))?,
        };

        let auth_mode = parse_auth_mode(optional("AUTH_MODE"), optional("AUTH_INTROSPECTION_URL"))?;

        let users_file = optional("CDR_USERS_FILE").map(PathBuf::from);

        let auth_issuer =
            std::env::var("AUTH_ISSUER").map_err(|_| ConfigError::Missing("AUTH_ISSUER"))?;

        let auth_audience =
            std::env::var("AUTH_AUDIENCE").map_err(|_| ConfigError::Missing("AUTH_AUDIENCE"))?;

        let access_jwt_public_key_pem = std::env::var("ACCESS_JWT_PUBLIC_KEY_PEM")
            .map_err(|_| ConfigError::Missing("ACCESS_JWT_PUBLIC_KEY_PEM"))?
            .replace("\\n", "\n");

        let access_jwt_algorithm = match optional("ACCESS_JWT_ALGORITHM") {
            None => AccessJwtAlgorithm::default(),
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Invalid("ACCESS_JWT_ALGORITHM"))?,
        };

        let access_token_leeway_seconds = std::env::var("ACCESS_TOKEN_LEEWAY_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        Ok(Self {
            addr,
            app_env,
            base_path,
            endpoints_file,
            specified_endpoints_only,
            missing_scopes,
            body_limit_bytes,
            auth_mode,
            users_file,
            auth_issuer,
            auth_audience,
            access_jwt_public_key_pem,
            access_jwt_algorithm,
            access_token_leeway_seconds,
        })
    }

    pub fn cdr_options(&self) -> CdrOptions {
        CdrOptions {
            specified_endpoints_only: self.specified_endpoints_only,
            missing_scopes: self.missing_scopes,
            body_limit_bytes: self.body_limit_bytes,
        }
    }
}
