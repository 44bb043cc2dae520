//! Tracing initialization: fmt subscriber with an env-filter.
//!
//! The filter defaults to `info` and is overridden with the standard
//! `RUST_LOG` variable, e.g. `RUST_LOG=studioctl=debug,tower_http=debug`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}
