//! # In-Memory Driver
//!
//! An in-process loopback backend: whatever the topic side publishes, the
//! subscription side receives, with uuid ack tokens and outstanding-ack
//! tracking. Useful as a test double (the driver is an identity pipe), for
//! demos, and as the reference implementation of the driver contract.

use crate::driver::{AckToken, DriverMessage, SubscriptionDriver, TopicDriver};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;
use uuid::Uuid;

/// Most messages handed out per `receive_batch` call.
const RECEIVE_BATCH_LIMIT: usize = 10;

struct QueuedMessage {
    message: DriverMessage,
    enqueued_at: DateTime<Utc>,
}

#[derive(Default)]
struct BrokerState {
    queue: VecDeque<QueuedMessage>,
    outstanding: HashSet<Vec<u8>>,
    topic_closed: bool,
    subscription_closed: bool,
}

/// One in-memory queue with a topic side and a subscription side.
#[derive(Clone, Default)]
pub struct MemBroker {
    state: Arc<Mutex<BrokerState>>,
    arrived: Arc<Notify>,
}

impl MemBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver handle for the publish side.
    pub fn topic_driver(&self) -> MemTopic {
        MemTopic {
            state: Arc::clone(&self.state),
            arrived: Arc::clone(&self.arrived),
        }
    }

    /// Driver handle for the receive/ack side.
    pub fn subscription_driver(&self) -> MemSubscription {
        MemSubscription {
            state: Arc::clone(&self.state),
            arrived: Arc::clone(&self.arrived),
        }
    }

    /// Messages published but not yet handed out.
    pub fn depth(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Messages handed out but not yet acknowledged.
    pub fn outstanding_acks(&self) -> usize {
        self.state.lock().outstanding.len()
    }
}

/// Publish side of a [`MemBroker`].
pub struct MemTopic {
    state: Arc<Mutex<BrokerState>>,
    arrived: Arc<Notify>,
}

#[async_trait]
impl TopicDriver for MemTopic {
    async fn send_batch(&self, batch: Vec<DriverMessage>) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.topic_closed {
                return Err(Error::Closed);
            }
            let now = Utc::now();
            for message in batch {
                state.queue.push_back(QueuedMessage {
                    message,
                    enqueued_at: now,
                });
            }
        }
        self.arrived.notify_waiters();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.topic_closed {
            return Err(Error::Closed);
        }
        state.topic_closed = true;
        Ok(())
    }
}

/// Receive/ack side of a [`MemBroker`].
pub struct MemSubscription {
    state: Arc<Mutex<BrokerState>>,
    arrived: Arc<Notify>,
}

#[async_trait]
impl SubscriptionDriver for MemSubscription {
    async fn receive_batch(&self) -> Result<Vec<DriverMessage>> {
        loop {
            // Register for wakeup before checking state, so a publish
            // landing between the check and the await is not missed.
            let arrived = self.arrived.notified();
            tokio::pin!(arrived);
            arrived.as_mut().enable();

            {
                let mut state = self.state.lock();
                if state.subscription_closed {
                    return Err(Error::Closed);
                }
                if !state.queue.is_empty() {
                    let take = state.queue.len().min(RECEIVE_BATCH_LIMIT);
                    let now = Utc::now();
                    let mut batch = Vec::with_capacity(take);
                    let mut oldest_ms = 0;
                    for entry in state.queue.drain(..take).collect::<Vec<_>>() {
                        oldest_ms = oldest_ms.max(
                            now.signed_duration_since(entry.enqueued_at).num_milliseconds(),
                        );
                        let token = Uuid::new_v4().as_bytes().to_vec();
                        let mut message = entry.message;
                        message.ack_token = Some(AckToken::new(token.clone()));
                        batch.push(message);
                        state.outstanding.insert(token);
                    }
                    debug!(
                        handed_out = batch.len(),
                        oldest_queued_ms = oldest_ms,
                        "mem driver handing out batch"
                    );
                    return Ok(batch);
                }
            }

            arrived.await;
        }
    }

    async fn send_acks(&self, tokens: Vec<AckToken>) -> Result<()> {
        let mut state = self.state.lock();
        if state.subscription_closed {
            return Err(Error::Closed);
        }
        for token in &tokens {
            if !state.outstanding.remove(token.as_bytes()) {
                return Err(Error::driver(
                    "acknowledgement for unknown or already-acknowledged token",
                ));
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.subscription_closed {
                return Err(Error::Closed);
            }
            state.subscription_closed = true;
        }
        // Wake any receive_batch blocked on an empty queue.
        self.arrived.notify_waiters();
        Ok(())
    }
}
