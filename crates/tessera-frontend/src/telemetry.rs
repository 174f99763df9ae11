//! Tracing subscriber setup

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter: engine crates at debug, HTTP client internals quiet.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(
        "info,\
         reqwest=warn,\
         hyper=warn,\
         hyper_util=warn,\
         h2=warn,\
         rustls=warn,\
         tessera=debug,\
         tessera_core=debug",
    )
}

/// Install a stderr subscriber. An explicit `filter` wins over `RUST_LOG`,
/// which wins over [`default_env_filter`].
pub fn init_tracing(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| anyhow!("Invalid log filter '{directives}': {e}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| default_env_filter()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}
