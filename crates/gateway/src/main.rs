use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use sha2::{Digest, Sha256};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use saarthi_conversations::{ConversationTracker, EscalationEngine};
use saarthi_domain::config::{Config, ConfigSeverity};
use saarthi_gateway::api;
use saarthi_gateway::calls::CallSupervisor;
use saarthi_gateway::cli::{Cli, Command, ConfigCommand};
use saarthi_gateway::events::EventCallback;
use saarthi_gateway::state::AppState;
use saarthi_handoff::{HandoffManager, RoomTokenMinter, TokenMinter, UnconfiguredMinter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, _config_path) = saarthi_gateway::cli::load_config()?;
            run_server(Arc::new(config)).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = saarthi_gateway::cli::load_config()?;
            let valid = saarthi_gateway::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = saarthi_gateway::cli::load_config()?;
            saarthi_gateway::cli::config::show(&config);
            Ok(())
        }
        Some(Command::Version) => {
            println!("saarthi {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Initialize structured tracing (only for the `serve` command).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,saarthi_gateway=debug")),
        )
        .init();
}

/// Start the gateway server with the given configuration.
async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("saarthi starting");

    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Core components ──────────────────────────────────────────────
    let tracker = Arc::new(ConversationTracker::new());
    let engine = Arc::new(EscalationEngine::new());

    let minter: Arc<dyn TokenMinter> = match RoomTokenMinter::from_config(&config.voice) {
        Ok(minter) => Arc::new(minter),
        Err(e) => {
            tracing::warn!(
                error = %e,
                "room credentials unavailable — operator token minting disabled"
            );
            Arc::new(UnconfiguredMinter)
        }
    };
    let manager = Arc::new(HandoffManager::new(minter));

    let events = Arc::new(EventCallback::new(&config.backend));
    if events.is_enabled() {
        tracing::info!(url = %config.backend.url, "backend event callback enabled");
    }

    let calls = Arc::new(CallSupervisor::new(
        tracker.clone(),
        engine.clone(),
        manager.clone(),
        events,
        None,
    ));

    // ── API token (read once, hashed) ────────────────────────────────
    let api_token_hash = match std::env::var(&config.server.api_token_env) {
        Ok(token) if !token.is_empty() => Some(Sha256::digest(token.as_bytes()).to_vec()),
        _ => {
            tracing::warn!(
                env = %config.server.api_token_env,
                "no API token configured — running without auth (dev mode)"
            );
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        tracker,
        engine,
        manager,
        calls: calls.clone(),
        api_token_hash,
    };

    // ── Router ───────────────────────────────────────────────────────
    let app = api::router(state.clone())
        .layer(build_cors_layer(&config.server.cors))
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    tracing::info!(addr = %addr, "saarthi listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    // Stop active call consumers before exiting.
    calls.shutdown().await;
    tracing::info!("saarthi stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

/// Build a [`CorsLayer`] from the configured allowed origins.
///
/// Supports exact origins and `"http://host:*"` wildcard-port patterns; a
/// single `"*"` entry means fully permissive.
fn build_cors_layer(cors: &saarthi_domain::config::CorsConfig) -> CorsLayer {
    use axum::http::header;

    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in &cors.allowed_origins {
        if origin.ends_with(":*") {
            // e.g. "http://localhost:*" -> prefix "http://localhost:"
            wildcard_prefixes.push(origin.trim_end_matches('*').to_owned());
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            // Wildcard-port patterns: the remainder must be digits only, so
            // "http://localhost:3000.evil.com" cannot slip through.
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
