//! # Batching Configuration
//!
//! Options controlling how long a topic or subscription waits for a batch
//! to fill before flushing it to the driver. Defaults are deliberately
//! small so a lone message is never held for long; both option types can
//! also be built from `MQPORT_*` environment variables.

use crate::error::{Error, Result};
use std::time::Duration;

/// Default assembly window for send and ack batches.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(10);

/// Default maximum entries per send or ack batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Batching policy for a [`Topic`](crate::topic::Topic).
///
/// A `batch_size` of zero or a zero `send_delay` disables coalescing: every
/// send is dispatched in its own batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicOptions {
    /// How long the first send of a batch waits for company before the
    /// batch is flushed anyway.
    pub send_delay: Duration,
    /// Flush immediately once this many sends have accumulated.
    pub batch_size: usize,
}

impl Default for TopicOptions {
    fn default() -> Self {
        Self {
            send_delay: DEFAULT_BATCH_DELAY,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl TopicOptions {
    /// Build options from the environment, falling back to defaults.
    ///
    /// Recognized variables: `MQPORT_SEND_DELAY_MS`, `MQPORT_BATCH_SIZE`.
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();

        if let Ok(raw) = std::env::var("MQPORT_SEND_DELAY_MS") {
            let millis: u64 = raw
                .parse()
                .map_err(|e| Error::config(format!("invalid MQPORT_SEND_DELAY_MS: {e}")))?;
            options.send_delay = Duration::from_millis(millis);
        }

        if let Ok(raw) = std::env::var("MQPORT_BATCH_SIZE") {
            options.batch_size = raw
                .parse()
                .map_err(|e| Error::config(format!("invalid MQPORT_BATCH_SIZE: {e}")))?;
        }

        Ok(options)
    }
}

/// Batching policy for a [`Subscription`](crate::subscription::Subscription).
///
/// Mirrors [`TopicOptions`] for acknowledgements: zero values disable
/// coalescing and every ack is dispatched on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionOptions {
    /// How long the first ack of a batch waits for company.
    pub ack_delay: Duration,
    /// Flush immediately once this many acks have accumulated.
    pub ack_batch_size: usize,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            ack_delay: DEFAULT_BATCH_DELAY,
            ack_batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SubscriptionOptions {
    /// Build options from the environment, falling back to defaults.
    ///
    /// Recognized variables: `MQPORT_ACK_DELAY_MS`, `MQPORT_ACK_BATCH_SIZE`.
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();

        if let Ok(raw) = std::env::var("MQPORT_ACK_DELAY_MS") {
            let millis: u64 = raw
                .parse()
                .map_err(|e| Error::config(format!("invalid MQPORT_ACK_DELAY_MS: {e}")))?;
            options.ack_delay = Duration::from_millis(millis);
        }

        if let Ok(raw) = std::env::var("MQPORT_ACK_BATCH_SIZE") {
            options.ack_batch_size = raw
                .parse()
                .map_err(|e| Error::config(format!("invalid MQPORT_ACK_BATCH_SIZE: {e}")))?;
        }

        Ok(options)
    }
}
