/// Factories: build the auth collaborators from application `Config`.
use std::sync::Arc;

use crate::config::{AuthMode, Config};
use crate::services::auth::{
    AccessJwtError, ClaimsDecoder, DirectoryUserResolver, IntrospectionUserResolver,
    JwtClaimsDecoder, UserDirectory, UserResolveError, UserResolver,
};

pub fn build_claims_decoder(config: &Config) -> Result<Arc<dyn ClaimsDecoder>, AccessJwtError> {
    let decoder = JwtClaimsDecoder::new(
        &config.access_jwt_public_key_pem,
        config.access_jwt_algorithm,
        &config.auth_issuer,
        &config.auth_audience,
        config.access_token_leeway_seconds,
    )?;

    Ok(Arc::new(decoder))
}

pub fn build_user_resolver(
    config: &Config,
    decoder: Arc<dyn ClaimsDecoder>,
) -> Result<Arc<dyn UserResolver>, UserResolveError> {
    let directory = UserDirectory::from_file(config.users_file.as_deref())?;
    tracing::info!(users = directory.len(), "user directory loaded");

    let resolver: Arc<dyn UserResolver> = match &config.auth_mode {
        AuthMode::Directory => Arc::new(DirectoryUserResolver::new(decoder, directory)),
        AuthMode::Introspection(url) => {
            Arc::new(IntrospectionUserResolver::new(url.clone(), directory)?)
        }
    };

    Ok(resolver)
}
