pub mod access_jwt;
pub mod directory;
pub mod factory;
pub mod introspection;
pub mod user;

pub use access_jwt::{
    AccessJwtAlgorithm, AccessJwtError, AccessTokenClaims, ClaimsDecoder, JwtClaimsDecoder,
    ScopeClaim,
};
pub use directory::DirectoryUserResolver;
pub use factory::{build_claims_decoder, build_user_resolver};
pub use introspection::{IntrospectionResponse, IntrospectionUserResolver};
pub use user::{CdrUser, UserDirectory, UserResolveError, UserResolver};
