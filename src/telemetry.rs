use anyhow::{anyhow, Result};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn,tower_http=info,sqlx=warn";

/// JSON logs, filtered by `RUST_LOG` when set.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
        .try_init()
        .map_err(|e| anyhow!("installing tracing subscriber: {e}"))
}

/// Resolves on Ctrl+C, or SIGTERM on unix; `axum::serve` then stops accepting.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    let signal_name = {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("installing SIGTERM listener");
        tokio::select! {
            result = signal::ctrl_c() => {
                result.expect("installing Ctrl+C listener");
                "ctrl_c"
            }
            _ = sigterm.recv() => "sigterm",
        }
    };
    #[cfg(not(unix))]
    let signal_name = {
        signal::ctrl_c().await.expect("installing Ctrl+C listener");
        "ctrl_c"
    };

    info!(signal = signal_name, "stopping API server");
}
