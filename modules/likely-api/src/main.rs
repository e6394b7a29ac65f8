use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use likely_api::{build_router, AppState};
use likely_common::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("likely=info".parse()?))
        .init();

    let config = Config::from_env()?;
    let state = Arc::new(AppState::from_config(&config).await?);
    let app = build_router(state);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("Likely API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
