// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # DocAuth Node
//!
//! Entry point for the `docauth-node` binary. Parses CLI arguments,
//! initializes logging and metrics, and serves the HTTP API.
//!
//! The binary supports four subcommands:
//!
//! - `run`    : start the API and metrics servers
//! - `keygen` : generate an identity bundle and print it as JSON
//! - `sign`   : sign a challenge locally and print the assertion
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use docauth_protocol::anchor::NullAnchor;
use docauth_protocol::auth::{sign_assertion, Authenticator, Challenge};
use docauth_protocol::config::{AuthConfig, CHALLENGE_PURGE_INTERVAL, PROTOCOL_VERSION};
use docauth_protocol::crypto::keys::IdentityKeypair;
use docauth_protocol::identity::{GeneratedIdentity, Identity};
use docauth_protocol::ledger::DocumentLedger;
use docauth_protocol::resolver::KeyRegistry;
use docauth_protocol::storage::LedgerDb;

use cli::{Commands, DocAuthCli, ResolverKind};
use logging::DEFAULT_LOG_FILTER;
use metrics::NodeMetrics;
use session::{SessionStore, MAX_SESSIONS};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DocAuthCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Keygen => keygen(),
        Commands::Sign(args) => sign(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the node: API server, metrics endpoint, and challenge and
/// session purge loop.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(DEFAULT_LOG_FILTER, args.log_format);

    tracing::info!(
        port = args.port,
        metrics_port = args.metrics_port,
        challenge_ttl_secs = args.challenge_ttl_secs,
        session_ttl_secs = args.session_ttl_secs,
        resolver = ?args.resolver,
        "starting docauth-node"
    );

    // --- Metrics ---
    let node_metrics =
        Arc::new(NodeMetrics::new().context("failed to create metrics registry")?);

    // --- Document ledger ---
    let ledger = match &args.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create data directory: {}", dir.display()))?;
            let store = LedgerDb::open(dir)
                .with_context(|| format!("failed to open database at {}", dir.display()))?;
            tracing::info!(path = %dir.display(), "database opened");

            let failures = node_metrics.persistence_failures_total.clone();
            DocumentLedger::with_store(store)
                .context("failed to load document ledger")?
                .on_persist_failure(move |_| failures.inc())
        }
        None => {
            tracing::warn!("no --data-dir given; documents are kept in memory only");
            DocumentLedger::new()
        }
    };
    let ledger = Arc::new(ledger);

    // --- Authenticator ---
    let registry = Arc::new(KeyRegistry::new());
    let auth_config = AuthConfig::from_ttl_secs(args.challenge_ttl_secs);
    let auth = Arc::new(match args.resolver {
        ResolverKind::Declared => Authenticator::new(auth_config),
        ResolverKind::Registry => Authenticator::with_resolver(auth_config, registry.clone()),
    });

    if args.allow_server_signing {
        tracing::warn!(
            "server-side signing is enabled: POST /assertions/sign accepts private keys over the wire"
        );
    }

    let sessions = Arc::new(SessionStore::new(
        Duration::from_secs(args.session_ttl_secs),
        MAX_SESSIONS,
    ));

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            PROTOCOL_VERSION,
        ),
        auth: Arc::clone(&auth),
        ledger: Arc::clone(&ledger),
        registry,
        anchor: Arc::new(NullAnchor),
        sessions: Arc::clone(&sessions),
        metrics: Arc::clone(&node_metrics),
        allow_server_signing: args.allow_server_signing,
        max_document_bytes: args.max_document_bytes,
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Challenge and session purge ---
    // Expired entries are already rejected on use; this only frees memory
    // held for clients that never came back.
    let purge_auth = Arc::clone(&auth);
    let purge_sessions = Arc::clone(&sessions);
    let purge_metrics = Arc::clone(&node_metrics);
    let purge_loop = tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHALLENGE_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            purge_auth.purge_expired();
            let expired = purge_sessions.purge_expired();
            if expired > 0 {
                tracing::debug!(expired, "expired sessions purged");
            }
            purge_metrics
                .pending_challenges
                .set(purge_auth.pending_count() as i64);
        }
    });

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    purge_loop.abort();
    let unpersisted = ledger.unpersisted_count();
    if unpersisted > 0 {
        tracing::warn!(unpersisted, "shutting down with records the store never accepted");
    }
    ledger.flush().context("failed to flush document store")?;
    tracing::info!("docauth-node stopped");
    Ok(())
}

/// Generates an identity and keypair and prints them as JSON on stdout.
fn keygen() -> Result<()> {
    let generated = GeneratedIdentity::new();
    let json = serde_json::to_string_pretty(&generated.export())?;
    println!("{json}");
    Ok(())
}

/// Signs a challenge with a local private key and prints the assertion.
fn sign(args: cli::SignArgs) -> Result<()> {
    let identity = Identity::new(&args.identity).context("invalid --identity")?;
    let challenge: Challenge = args.challenge.parse().context("invalid --challenge")?;
    let keypair = IdentityKeypair::from_hex(&args.private_key).context("invalid --private-key")?;

    let assertion = sign_assertion(&keypair, &identity, &challenge);
    println!("{}", serde_json::to_string_pretty(&assertion)?);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("docauth-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol     {}", PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
