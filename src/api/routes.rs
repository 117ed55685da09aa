/*
 * Responsibility
 * - data holder の URL 構造を定義
 * - /health は CDR chain の外、それ以外は全て fallback (stub) + CDR chain
 */
use axum::{Router, routing::get};

use crate::api::handlers::{data_holder::data_holder_stub, health::health};
use crate::middleware;
use crate::state::CdrState;

pub fn routes(state: CdrState) -> Router {
    let cdr = middleware::cdr::apply(Router::new().fallback(data_holder_stub), state);

    Router::new().route("/health", get(health)).merge(cdr)
}
