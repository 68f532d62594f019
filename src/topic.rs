//! # Topic
//!
//! Caller-facing send side. A `Topic` wraps one batch-oriented
//! [`TopicDriver`] handle in a send batcher: concurrent per-message `send`
//! calls are coalesced under the topic's [`TopicOptions`] and dispatched as
//! single `send_batch` driver calls, with the batch outcome fanned back out
//! to every caller.

use crate::batcher::{BatchDispatcher, BatchPolicy, Batcher};
use crate::config::TopicOptions;
use crate::driver::{DriverMessage, TopicDriver};
use crate::error::{Error, Result};
use crate::message::Message;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct Topic {
    driver: Arc<dyn TopicDriver>,
    batcher: Batcher<DriverMessage>,
}

struct SendDispatcher {
    driver: Arc<dyn TopicDriver>,
}

#[async_trait]
impl BatchDispatcher for SendDispatcher {
    type Item = DriverMessage;

    async fn dispatch(&mut self, items: Vec<DriverMessage>) -> Result<()> {
        self.driver.send_batch(items).await
    }
}

impl Topic {
    /// Wrap a driver handle and start the background send worker. No
    /// driver I/O happens here beyond what the handle already performed.
    pub fn new(driver: impl TopicDriver + 'static, options: TopicOptions) -> Self {
        let driver: Arc<dyn TopicDriver> = Arc::new(driver);
        let policy = BatchPolicy {
            delay: options.send_delay,
            max_size: options.batch_size,
        };
        let batcher = Batcher::start(
            policy,
            SendDispatcher {
                driver: Arc::clone(&driver),
            },
        );
        Self { driver, batcher }
    }

    /// Send one message, suspending until the batch it joins has been
    /// dispatched and its outcome is known.
    ///
    /// Cancel-safe: dropping the future abandons the wait, and the entry
    /// is discarded if its batch has not been dispatched yet. After
    /// [`close`](Self::close) this returns [`Error::Closed`] without
    /// reaching the driver.
    pub async fn send(&self, message: Message) -> Result<()> {
        self.batcher.submit(message.into_driver()).await
    }

    /// [`send`](Self::send) with a deadline; elapsing yields
    /// [`Error::Cancelled`] while any already-dispatched batch completes
    /// for its other members.
    pub async fn send_timeout(&self, message: Message, deadline: Duration) -> Result<()> {
        tokio::time::timeout(deadline, self.send(message))
            .await
            .map_err(|_| Error::Cancelled)?
    }

    /// Whether the topic still accepts sends.
    pub fn is_open(&self) -> bool {
        self.batcher.is_open()
    }

    /// Stop accepting sends, give the pending batch a chance to flush,
    /// then close the driver handle, returning the driver's own close
    /// result. A second call returns [`Error::Closed`].
    pub async fn close(&self) -> Result<()> {
        if !self.batcher.shutdown().await {
            return Err(Error::Closed);
        }
        debug!("topic send worker stopped, closing driver");
        self.driver.close().await
    }
}
