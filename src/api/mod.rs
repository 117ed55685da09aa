/*
 * Responsibility
 * - data holder の HTTP 入口 (routes() の re-export)
 */
pub mod handlers;
mod routes;

pub use routes::routes;
