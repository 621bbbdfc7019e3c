//! Logging setup. Library code emits `tracing` events; binaries call [`init`]
//! once to install a subscriber.

use tracing_subscriber::EnvFilter;

use crate::common::config::{LogCfg, LogFormat};
use crate::common::error::{NpkError, NpkResult};

/// Install the global subscriber. JSON output writes one object per line.
pub fn init(cfg: &LogCfg) -> NpkResult<()> {
    let filter = EnvFilter::try_new(&cfg.level)
        .map_err(|e| NpkError::config(format!("invalid log level '{}': {e}", cfg.level)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = match cfg.format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Text => builder.try_init(),
    };
    installed.map_err(|e| NpkError::config(format!("logger already installed: {e}")))
}
