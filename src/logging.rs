//! # Structured Logging
//!
//! Opt-in tracing setup for binaries and tests. The core itself only emits
//! `tracing` events; installing a subscriber is the host application's call.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install a console tracing subscriber filtered by `MQPORT_LOG`
/// (falling back to `RUST_LOG`, then `info`).
///
/// Safe to call more than once, and a no-op when the embedding application
/// has already installed a global subscriber.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_env("MQPORT_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_filter(filter),
        );

        // A host may have installed its own subscriber first; that one wins.
        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already installed");
        }
    });
}
