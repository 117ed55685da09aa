/*!
 * CDR middleware chain
 *
 * Responsibility:
 * - request を CDR の規約で検証する axum middleware 群
 *   endpoint → headers → jwt scopes → authentication → scope → resource
 * - 各 validator は成功なら next、失敗なら ErrorList を body にした終端レスポンス
 * - validator 間の受け渡しは request extensions (Resolution / GrantedScopes / CdrUser / NegotiatedVersion)
 */

use axum::{Router, middleware::from_fn_with_state};
use tower::ServiceBuilder;

use crate::state::CdrState;

pub mod authentication;
pub mod context;
pub mod endpoint;
pub mod headers;
pub mod jwt_scopes;
pub mod resource;
pub mod scope;

pub use self::authentication::authenticate;
pub use self::context::{GrantedScopes, NegotiatedVersion};
pub use self::endpoint::validate_endpoint;
pub use self::headers::{X_FAPI_INTERACTION_ID, X_MIN_V, X_V, validate_headers};
pub use self::jwt_scopes::attach_jwt_scopes;
pub use self::resource::validate_resource;
pub use self::scope::validate_scope;

/// Install the full validator chain on `router` (routes and fallback alike).
///
/// Call after every route that should be guarded has been added.
pub fn apply<S>(router: Router<S>, state: CdrState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // ServiceBuilder: the first layer is the outermost.
    let chain = ServiceBuilder::new()
        .layer(from_fn_with_state(state.clone(), validate_endpoint))
        .layer(from_fn_with_state(state.clone(), validate_headers))
        .layer(from_fn_with_state(state.clone(), attach_jwt_scopes))
        .layer(from_fn_with_state(state.clone(), authenticate))
        .layer(from_fn_with_state(state.clone(), validate_scope))
        .layer(from_fn_with_state(state, validate_resource));

    router.layer(chain)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        http::{Method, Request, request::Builder},
        response::Response,
    };
    use http_body_util::BodyExt;

    use crate::catalog::Catalog;
    use crate::error::ErrorList;
    use crate::resolver::PathResolver;
    use crate::services::auth::access_jwt::{JwtClaimsDecoder, test_support as jwt};
    use crate::services::auth::{CdrUser, DirectoryUserResolver, UserDirectory};
    use crate::state::{CdrOptions, CdrState};

    pub const JANE: &str = "jane";
    pub const JANE_CUSTOMER_ID: &str = "c-100";

    /// Router whose fallback answers 200 "ok", behind one validator.
    macro_rules! guarded {
        ($state:expr, $middleware:expr) => {
            axum::Router::new()
                .fallback(|| async { "ok" })
                .layer(axum::middleware::from_fn_with_state($state, $middleware))
        };
    }
    pub(crate) use guarded;

    pub fn jane() -> CdrUser {
        CdrUser {
            customer_id: JANE_CUSTOMER_ID.into(),
            login_id: Some(JANE.into()),
            accounts_banking: vec!["1234567".into()],
            accounts_energy: vec!["acc-1".into(), "acc-2".into()],
            energy_service_points: vec!["sp-1".into()],
            banking_payees: vec!["payee-1".into()],
            scopes_supported: None,
        }
    }

    fn build(catalog: Catalog, base_path: &str, options: CdrOptions) -> CdrState {
        let decoder = Arc::new(JwtClaimsDecoder::hs256(jwt::SECRET, jwt::ISSUER, jwt::AUDIENCE));
        let users = Arc::new(DirectoryUserResolver::new(
            decoder.clone(),
            UserDirectory::new([jane()]),
        ));
        CdrState::new(
            catalog,
            PathResolver::new(base_path),
            users,
            decoder,
            options,
        )
    }

    pub fn state() -> CdrState {
        state_with_options(CdrOptions::default())
    }

    pub fn state_with_options(options: CdrOptions) -> CdrState {
        build(Catalog::standard().unwrap(), "/cds-au/v1", options)
    }

    pub fn state_with_base_path(base_path: &str, options: CdrOptions) -> CdrState {
        build(Catalog::standard().unwrap(), base_path, options)
    }

    pub fn state_with_configured(json: &str, options: CdrOptions) -> CdrState {
        build(
            Catalog::with_configured_json(json).unwrap(),
            "/cds-au/v1",
            options,
        )
    }

    pub fn get(uri: &str) -> Builder {
        Request::builder().method(Method::GET).uri(uri)
    }

    pub async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub async fn error_list(response: Response) -> ErrorList {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}
