//! Inicialização do `tracing-subscriber`.
//!
//! `--verbose` força `debug`; fora isso `RUST_LOG` tem precedência e, sem
//! ele, vale o nível configurado.

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': {source}")]
    EnvFilter {
        value: String,
        #[source]
        source: ParseError,
    },

    #[error("telemetry error: {0}")]
    Subscriber(#[source] Box<dyn std::error::Error + Send + Sync>),
}

const VERBOSE_LEVEL: &str = "debug";

/// Resolve o filtro efetivo: `debug` com `verbose`, senão `RUST_LOG` se
/// presente, senão `level`.
pub fn filter(level: &str, verbose: bool) -> Result<EnvFilter, TelemetryError> {
    if verbose {
        return Ok(EnvFilter::new(VERBOSE_LEVEL));
    }
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|source| TelemetryError::EnvFilter {
            value: level.to_string(),
            source,
        }),
    }
}

pub fn init(level: &str, verbose: bool) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(level, verbose)?)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
