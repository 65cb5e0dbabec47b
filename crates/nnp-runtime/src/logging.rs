//! Logging initialization.
//!
//! Library code only emits `tracing` events; hosts call [`init`] once to
//! install a subscriber.

use nnp_core::version::version_string;
use nnp_core::Config;
use tracing::Level;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber.
///
/// # Arguments
/// * `verbosity` - 0 = INFO, 1 = DEBUG, 2+ = TRACE
/// * `json` - If true, output JSON lines to stderr
///
/// `RUST_LOG` is honoured; the verbosity applies to the `nnp_runtime` target
/// on top of it.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init(verbosity: u8, json: bool) -> Result<(), TryInitError> {
    let level = level_for(verbosity);

    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Ok(directive) = format!("nnp_runtime={level}").parse() {
        filter = filter.add_directive(directive);
    }

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    installed?;
    log_startup();
    Ok(())
}

fn log_startup() {
    tracing::debug!(version = %version_string(), "logging initialized");
}

/// [`init`] with the verbosity and format stored in `config`.
///
/// # Errors
/// Same as [`init`].
pub fn init_from_config(config: &Config) -> Result<(), TryInitError> {
    init(config.verbosity, config.json_logs)
}

fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
