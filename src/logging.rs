//! Logging initialization for binaries.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the executable. `RUST_LOG` overrides the default level.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Install a console subscriber. `verbose` lowers the default level from
/// `info` to `debug`, which includes per-update solver diagnostics.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false));

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
