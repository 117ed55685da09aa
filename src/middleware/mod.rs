/*
 * Responsibility
 * - middleware の公開インターフェース (re-export)
 * - http: transport 層 (trace / body limit / timeout)
 * - cdr: CDR validator chain
 */
pub mod cdr;
pub mod http;
