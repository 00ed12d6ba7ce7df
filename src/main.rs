use anyhow::Result;
use axum::Router;
use config::Config;
use load_shifting_carbon::{api, app, config, telemetry};
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cfg = Config::load()?;
    let state = app::AppState::new(cfg.clone()).await?;

    #[allow(unused_mut)]
    let mut app: Router = api::router(state, &cfg);

    #[cfg(feature = "metrics")]
    {
        app = api::with_metrics(app);
    }

    let addr = cfg.server.socket_addr()?;
    if cfg.server.host == "0.0.0.0" {
        warn!("binding to 0.0.0.0; the API has no authentication");
    }

    info!(%addr, "starting load-shifting-carbon");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
