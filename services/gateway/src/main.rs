//! Multi-chain blockchain RPC acceleration gateway entry point.
//!
//! Usage:
//!   gateway --config config/gateway.toml

use anyhow::{Context, Result};
use clap::Parser;
use gw_keystore::{DefaultEntropy, KeystoreManager};
use gw_types::{OsRandom, RandomSource, Tier};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server as HyperServer};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use gateway::server::Server;
use gateway::{fastpath, middleware, relay_loop, router};

#[derive(Parser, Debug)]
#[command(name = "gateway")]
#[command(about = "Multi-chain blockchain RPC acceleration gateway")]
#[command(version)]
struct Args {
    /// Path to the gateway TOML configuration file.
    #[arg(short, long)]
    config: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("loading configuration from {}", args.config);
    let config = gw_config::GatewayConfig::load(&args.config).context("failed to load gateway configuration")?;

    let random: Arc<dyn RandomSource> = Arc::new(OsRandom);
    let entropy = Arc::new(DefaultEntropy::new(OsRandom));
    let keystore = Arc::new(KeystoreManager::new(config.keystore.directory.clone(), entropy));

    let bind_address = config.server.bind_address.clone();
    let port = config.server.port;
    let api_keys_file = config.keys.api_keys_file.clone();

    let server = Arc::new(Server::new(config, random, keystore));

    if let Some(path) = api_keys_file {
        let now = gw_types::unix_now();
        match server.api_keys.load_from_file(&path, now) {
            Ok(count) => info!(count, "loaded external API keys"),
            Err(e) => error!(error = %e, "failed to load external API keys, continuing with bootstrap key only"),
        }
    }

    register_backends(&server);
    relay_loop::spawn_relay_loops(server.clone());
    fastpath::spawn_refreshers(server.clone());
    spawn_sweepers(server.clone());

    let addr: SocketAddr = format!("{bind_address}:{port}").parse().context("invalid bind address")?;
    serve(server, addr).await
}

fn init_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn register_backends(server: &Arc<Server>) {
    for (name, chain_config) in &server.config.chains {
        let backend = Arc::new(gw_relay::JsonRpcBackend::new(name.clone(), chain_config.endpoints.clone()));
        server.backends.register(name, backend, Tier::Free.breaker_params(), server.clock.clone());
        info!(chain = name, endpoints = chain_config.endpoints.len(), "registered chain backend");
    }
}

/// Periodically sweep idle rate-limit buckets so long-running processes
/// don't accumulate one bucket per identifier forever (§4.1).
fn spawn_sweepers(server: Arc<Server>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            ticker.tick().await;
            server.rate_limiter.sweep(3600 * 1_000_000_000);
        }
    });
}

async fn serve(server: Arc<Server>, addr: SocketAddr) -> Result<()> {
    let make_svc = make_service_fn(move |_conn| {
        let server = server.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let server = server.clone();
                async move { Ok::<Response<Body>, Infallible>(middleware::guarded(move || router::route(server, req)).await) }
            }))
        }
    });

    let hyper_server = HyperServer::bind(&addr).serve(make_svc);
    info!("gateway listening on http://{addr}");

    let graceful = hyper_server.with_graceful_shutdown(shutdown_signal());
    if let Err(e) = graceful.await {
        error!(error = %e, "server error");
    }

    for chain in server.backends.list() {
        if let Some(relay) = server.backends.relay_state_of(&chain) {
            relay.close();
        }
    }
    info!("all chain relays closed, exiting");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install CTRL+C signal handler");
    info!("shutdown signal received");
}
