/*
 * Responsibility
 * - Config読み込み → catalog / resolver / auth collaborators の生成 → Router 組み立て
 * - HTTP plumbing (trace / body limit / timeout) の適用
 * - axum::serve() で起動
 */
use std::{panic, process};

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::middleware;
use crate::resolver::PathResolver;
use crate::services::auth::{build_claims_decoder, build_user_resolver};
use crate::state::CdrState;

fn init_tracing() {
    // RUST_LOG wins, e.g. RUST_LOG=info,cdr_middleware=debug,tower_http=debug
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting CDR data holder in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_state(config: &Config) -> Result<CdrState> {
    let catalog = Catalog::from_file(config.endpoints_file.as_deref())?;
    tracing::info!(
        standard = catalog.full_catalog().len(),
        configured = catalog.configured_catalog().len(),
        "endpoint catalog loaded"
    );

    if catalog.configured_catalog().is_empty() {
        tracing::warn!("configured endpoint catalog is empty; every CDR endpoint is not implemented");
    }

    let resolver = PathResolver::new(&config.base_path);
    if resolver.base_path().is_empty() {
        tracing::warn!("no base path configured; CDR paths are resolved from the root");
    }
    let decoder = build_claims_decoder(config)?;
    let users = build_user_resolver(config, decoder.clone())?;
    tracing::info!(
        backend = users.backend_name(),
        strict = config.specified_endpoints_only,
        "auth collaborators ready"
    );

    Ok(CdrState::new(
        catalog,
        resolver,
        users,
        decoder,
        config.cdr_options(),
    ))
}

fn build_router(state: CdrState, config: &Config) -> Router {
    middleware::http::apply(api::routes(state), config.body_limit_bytes)
}
