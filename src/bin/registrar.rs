//! Registrar entry point.
//!
//! Starts the central membership authority on the well-known registry port.
//! One instance serves the whole deployment.
//!
//! ## Environment Variables
//! - `REGISTRY_HOST` / `REGISTRY_PORT`: bind address (default `127.0.0.1:1099`).

use std::net::SocketAddr;

use ring_election::config::Config;
use ring_election::registrar::{handlers, service::RegistrarService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = Config::from_env();
    let bind_addr: SocketAddr =
        format!("{}:{}", config.registry_host, config.registry_port).parse()?;

    let service = RegistrarService::new();
    let app = handlers::router(service);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Registrar listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
