//! Consumer Data Right (CDR) request validation for axum.
//!
//! The endpoint catalog and path resolver decide which CDS endpoint a request
//! targets; the middleware in [`middleware::cdr`] enforces headers, consent,
//! authentication and resource ownership against that decision.

pub mod api;
pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod middleware;
pub mod resolver;
pub mod services;
pub mod state;
