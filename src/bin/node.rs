//! Node entry point: `node <uid>`.
//!
//! Binds the node's endpoint, registers with the registrar, starts the
//! failure detector, and hands the terminal to the operator console. On a
//! clean `exit` the schedulers stop first and the registry binding is
//! released last.
//!
//! ## Environment Variables
//! - `REGISTRY_HOST` / `REGISTRY_PORT`: where the registrar lives.
//! - `NODE_BIND`: local endpoint bind address (default `127.0.0.1:0`).
//! - Timings: `ELECTION_TIMEOUT_MS`, `HEARTBEAT_INTERVAL_MS`, `MAX_ROUNDS`,
//!   `NETWORK_DELAY_MS`, `FORWARD_RETRIES`, `RETRY_DELAY_MS`.

use std::time::Duration;

use ring_election::config::Config;
use ring_election::console;
use ring_election::node::{detector, handlers, service::NodeService};
use ring_election::registrar::client::RegistrarClient;
use ring_election::registrar::types::Uid;

/// How long shutdown waits for the heartbeat scheduler to drain before
/// aborting it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <uid>", args[0]);
        std::process::exit(1);
    }
    let uid: Uid = match args[1].parse() {
        Ok(uid) if uid > 0 => uid,
        _ => {
            eprintln!("uid must be a positive integer, got '{}'", args[1]);
            std::process::exit(1);
        }
    };

    let config = Config::from_env();
    let registrar = RegistrarClient::new(config.registry_url());

    let listener = tokio::net::TcpListener::bind(config.node_bind).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!("Node {} endpoint on {}", uid, local_addr);

    let node = NodeService::new(uid, local_addr, registrar, config);
    let app = handlers::router(node.clone());
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Node endpoint server failed: {}", e);
        }
    });

    // The endpoint must be serving before registration: admitting a second
    // member makes the registrar probe and assign successors immediately.
    node.registrar().register(uid, local_addr).await?;
    tracing::info!(
        "Node {} registered with registrar at {}",
        uid,
        node.registrar().base_url()
    );

    let mut heartbeat = detector::start(node.clone());

    console::run(node.clone()).await?;

    // Clean shutdown: stop schedulers, then release the registry binding last.
    node.stop();
    if tokio::time::timeout(SHUTDOWN_GRACE, &mut heartbeat).await.is_err() {
        heartbeat.abort();
    }
    server.abort();
    if let Err(e) = node.registrar().deregister(uid).await {
        tracing::warn!("Deregistration failed: {}", e);
    }

    Ok(())
}
