use std::net::SocketAddr;

use anyhow::Context;
use dotenvy::dotenv;
use jifunze::logging::init_tracing;
use jifunze::metrics::init_metrics;
use jifunze::router::init_router;
use jifunze::state::init_app_state;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let metrics = init_metrics().unwrap_or_else(|e| {
        error!(error = %e, "Failed to install the Prometheus recorder, metrics disabled");
        None
    });

    let state = init_app_state(metrics).await?;
    let app = init_router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
