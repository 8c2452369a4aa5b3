use clap::ValueEnum;
use tracing_subscriber::filter::{Builder, LevelFilter};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// `info` unless directives say otherwise.
fn filter_builder() -> Builder {
    EnvFilter::builder().with_default_directive(LevelFilter::INFO.into())
}

/// Installs the global tracing subscriber. `RUST_LOG` replaces the default `info` level when set.
pub fn init_tracing(format: LogFormat) {
    let filter = filter_builder().from_env_lossy();

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().flatten_event(true).with_current_span(true))
            .with(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(filter)
            .init(),
    }
}
