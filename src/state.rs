/*
 * Responsibility
 * - CDR middleware chain が共有する context (CdrState)
 *   - catalog / resolver / auth collaborators / options
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::resolver::PathResolver;
use crate::services::auth::{ClaimsDecoder, UserResolver};

/// What the scope validator does when a caller's scopes are undefined (no
/// token scopes and no `scopesSupported` on the user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingScopesPolicy {
    Allow,
    #[default]
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdrOptions {
    /// Strict mode: reject requests that do not resolve to an implemented
    /// endpoint.
    pub specified_endpoints_only: bool,
    pub missing_scopes: MissingScopesPolicy,
    /// Max body buffered when inspecting batch POST requests.
    pub body_limit_bytes: usize,
}

impl Default for CdrOptions {
    fn default() -> Self {
        Self {
            specified_endpoints_only: true,
            missing_scopes: MissingScopesPolicy::Deny,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

#[derive(Clone)]
pub struct CdrState {
    pub catalog: Arc<Catalog>,
    pub resolver: Arc<PathResolver>,
    pub users: Arc<dyn UserResolver>,
    pub decoder: Arc<dyn ClaimsDecoder>,
    pub options: CdrOptions,
}

impl CdrState {
    pub fn new(
        catalog: Catalog,
        resolver: PathResolver,
        users: Arc<dyn UserResolver>,
        decoder: Arc<dyn ClaimsDecoder>,
        options: CdrOptions,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            resolver: Arc::new(resolver),
            users,
            decoder,
            options,
        }
    }
}

impl std::fmt::Debug for CdrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdrState")
            .field("configured_endpoints", &self.catalog.configured_catalog().len())
            .field("resolver", &self.resolver)
            .field("users", &self.users.backend_name())
            .field("options", &self.options)
            .finish()
    }
}
