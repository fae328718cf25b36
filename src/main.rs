//! The backend for the OpsGuard workforce scheduling service.

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use opsguard::db;
use opsguard::routes::{api_router, ApiConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("opsguard=info")),
        )
        .init();

    let pool = db::connect().await?;
    let app = api_router(pool, ApiConfig::from_env());

    let port = std::env::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "starting the OpsGuard API");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
