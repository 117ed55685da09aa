/*!
 * Path resolver
 *
 * Responsibility:
 * - request の method + path を catalog の endpoint 定義に解決する
 * - base path の除去、host / query / trailing slash の正規化
 *
 * Public API:
 * - PathResolver::resolve -> Resolution (Implemented / NotImplemented / NotFound)
 */

mod matcher;
mod path;

pub use self::matcher::{PathResolver, Resolution, ResolvedEndpoint};
pub use self::path::{BasePath, request_segments};
