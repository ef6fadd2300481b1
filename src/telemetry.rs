//! Opt-in tracing and report setup for binaries and integration harnesses.
//!
//! The library itself never installs a global subscriber; it only emits
//! `tracing` events. Hosts that want structured output call [`init`] once at
//! startup.

use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the default subscriber stack: env-filtered fmt output plus span
/// traces on captured errors, and miette's pretty panic reports.
///
/// `RUST_LOG` overrides the default `warn,ledgerflow=info` filter. Calling
/// this twice panics (a global subscriber is already set); use
/// [`try_init`] when the host may have installed its own.
pub fn init() {
    try_init().unwrap_or_else(|e| panic!("telemetry init failed: {e}"));
}

/// Fallible variant of [`init`] for hosts that may already have a global
/// subscriber installed.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,ledgerflow=info"));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()?;

    miette::set_panic_hook();
    Ok(())
}
