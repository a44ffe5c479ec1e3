//! Tracing subscriber setup for applications embedding the client.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` wins over `log_level` when set. With `json` the output is one
/// JSON object per event, otherwise the compact formatter is used.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed.
pub fn init_tracing(log_level: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).try_init()?;
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).try_init()?;
    }

    Ok(())
}
