/*
 * Responsibility
 * - CDR path 全体を受ける stub handler
 * - validator chain が request に付けた context (Resolution / NegotiatedVersion / CdrUser) を返す
 */
use axum::{
    Extension, Json,
    extract::OriginalUri,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};

use crate::error::{CdrRejection, ErrorCode, ErrorList};
use crate::middleware::cdr::NegotiatedVersion;
use crate::resolver::Resolution;
use crate::services::auth::CdrUser;

/// Echo what the chain resolved; a real data holder would serve data here.
///
/// Only reachable for unmatched paths when strict mode is off.
pub async fn data_holder_stub(
    method: Method,
    OriginalUri(uri): OriginalUri,
    resolution: Option<Extension<Resolution>>,
    version: Option<Extension<NegotiatedVersion>>,
    user: Option<Extension<CdrUser>>,
) -> Response {
    let Some(Extension(Resolution::Implemented(endpoint))) = resolution else {
        return CdrRejection::NotFound(ErrorList::single(
            ErrorCode::ResourceNotFound,
            "No data holder handler for this path",
        ))
        .into_response();
    };

    let params: Map<String, Value> = endpoint
        .params
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();

    let body = json!({
        "data": {
            "method": method.as_str(),
            "endpoint": endpoint.definition.path_template(),
            "params": params,
            "version": version.map(|Extension(NegotiatedVersion(v))| v),
            "customerId": user.map(|Extension(u)| u.customer_id),
        },
        "links": { "self": uri.to_string() },
        "meta": {},
    });

    (StatusCode::OK, Json(body)).into_response()
}
