use boxoffice_types::{BoxofficeError, Result, ServerConfig};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured filter when set.
pub fn init(config: &ServerConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .map_err(|e| BoxofficeError::Configuration(format!("log filter: {e}")))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| BoxofficeError::Configuration(format!("tracing subscriber: {e}")))
}
