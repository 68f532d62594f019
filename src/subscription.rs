//! # Subscription
//!
//! Caller-facing receive/ack side. A `Subscription` wraps one
//! [`SubscriptionDriver`] handle in two workers:
//!
//! - the receive worker owns a local FIFO queue of driver messages and
//!   serves per-message `receive` calls from it, refilling with exactly
//!   one `receive_batch` call no matter how many callers are waiting;
//! - the ack batcher coalesces per-message acknowledgements into
//!   `send_acks` calls, mirroring the topic's send batcher.
//!
//! Messages handed out carry a `Weak` reference back to the subscription
//! so their acknowledgement can find the ack batcher without extending the
//! subscription's lifetime.

use crate::batcher::{BatchDispatcher, BatchPolicy, Batcher};
use crate::config::SubscriptionOptions;
use crate::driver::{AckToken, DriverMessage, SubscriptionDriver};
use crate::error::{Error, Result};
use crate::message::Message;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Completion slot for one waiting `receive` call.
type ReceiveReply = oneshot::Sender<Result<DriverMessage>>;

/// Ack routing target shared with outstanding [`Message`]s via `Weak`.
pub(crate) struct SubscriptionInner {
    ack_batcher: Batcher<AckToken>,
}

impl SubscriptionInner {
    pub(crate) async fn ack(&self, token: AckToken) -> Result<()> {
        self.ack_batcher.submit(token).await
    }
}

struct AckDispatcher {
    driver: Arc<dyn SubscriptionDriver>,
}

#[async_trait]
impl BatchDispatcher for AckDispatcher {
    type Item = AckToken;

    async fn dispatch(&mut self, items: Vec<AckToken>) -> Result<()> {
        self.driver.send_acks(items).await
    }
}

pub struct Subscription {
    inner: Arc<SubscriptionInner>,
    driver: Arc<dyn SubscriptionDriver>,
    requests: Mutex<Option<mpsc::UnboundedSender<ReceiveReply>>>,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    receive_worker: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    /// Wrap a driver handle and start the receive and ack workers. No
    /// driver I/O happens here beyond what the handle already performed.
    pub fn new(driver: impl SubscriptionDriver + 'static, options: SubscriptionOptions) -> Self {
        let driver: Arc<dyn SubscriptionDriver> = Arc::new(driver);
        let policy = BatchPolicy {
            delay: options.ack_delay,
            max_size: options.ack_batch_size,
        };
        let inner = Arc::new(SubscriptionInner {
            ack_batcher: Batcher::start(
                policy,
                AckDispatcher {
                    driver: Arc::clone(&driver),
                },
            ),
        });

        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let receive_worker = tokio::spawn(receive_loop(
            requests_rx,
            stop_rx,
            Arc::clone(&driver),
        ));

        Self {
            inner,
            driver,
            requests: Mutex::new(Some(requests_tx)),
            stop: Mutex::new(Some(stop_tx)),
            receive_worker: Mutex::new(Some(receive_worker)),
        }
    }

    /// Receive one message, suspending until the local queue is non-empty
    /// or a driver fetch completes.
    ///
    /// Messages come out in fetch order. Concurrent callers share a single
    /// in-flight `receive_batch`; a fetch error goes to the callers
    /// waiting on that fetch and is not cached for later ones. After
    /// [`close`](Self::close) this returns [`Error::Closed`] without
    /// reaching the driver.
    pub async fn receive(&self) -> Result<Message> {
        let (reply, response) = oneshot::channel();
        {
            let guard = self.requests.lock();
            let requests = guard.as_ref().ok_or(Error::Closed)?;
            requests.send(reply).map_err(|_| Error::Closed)?;
        }
        let raw = response.await.unwrap_or(Err(Error::Closed))?;
        Ok(Message::from_driver(raw, Arc::downgrade(&self.inner)))
    }

    /// [`receive`](Self::receive) with a deadline; elapsing yields
    /// [`Error::Cancelled`] and gives up the caller's place in line.
    pub async fn receive_timeout(&self, deadline: Duration) -> Result<Message> {
        tokio::time::timeout(deadline, self.receive())
            .await
            .map_err(|_| Error::Cancelled)?
    }

    /// Whether the subscription still accepts operations.
    pub fn is_open(&self) -> bool {
        self.requests.lock().is_some()
    }

    /// Stop accepting receives and acks, give the pending ack batch a
    /// chance to flush, then close the driver handle, returning the
    /// driver's own close result. Callers still waiting in `receive` get
    /// [`Error::Closed`]. A second call returns [`Error::Closed`].
    pub async fn close(&self) -> Result<()> {
        let requests = self.requests.lock().take();
        if requests.is_none() {
            return Err(Error::Closed);
        }
        drop(requests);

        if let Some(stop) = self.stop.lock().take() {
            let _ = stop.send(());
        }
        let worker = self.receive_worker.lock().take();
        if let Some(handle) = worker {
            let _ = handle.await;
        }
        self.inner.ack_batcher.shutdown().await;
        debug!("subscription workers stopped, closing driver");
        self.driver.close().await
    }
}

/// Sole owner of the local message queue. Serves one waiting caller at a
/// time; an empty queue triggers exactly one driver fetch on behalf of
/// every caller queued behind it.
async fn receive_loop(
    mut requests: mpsc::UnboundedReceiver<ReceiveReply>,
    mut stop: oneshot::Receiver<()>,
    driver: Arc<dyn SubscriptionDriver>,
) {
    let mut queue: VecDeque<DriverMessage> = VecDeque::new();
    'requests: loop {
        let reply = tokio::select! {
            _ = &mut stop => break 'requests,
            request = requests.recv() => match request {
                Some(reply) => reply,
                None => break 'requests,
            },
        };
        // The caller may have stopped waiting while queued.
        if reply.is_closed() {
            continue 'requests;
        }

        while queue.is_empty() {
            let fetched = tokio::select! {
                _ = &mut stop => break 'requests,
                result = driver.receive_batch() => result,
            };
            match fetched {
                Ok(batch) => {
                    debug!(fetched = batch.len(), "refilled local message queue");
                    queue.extend(batch);
                }
                Err(error) => {
                    // Fail everyone waiting on this fetch; the next caller
                    // to arrive triggers a fresh attempt.
                    let _ = reply.send(Err(error.clone()));
                    while let Ok(waiter) = requests.try_recv() {
                        let _ = waiter.send(Err(error.clone()));
                    }
                    continue 'requests;
                }
            }
        }

        if let Some(message) = queue.pop_front() {
            // A caller that cancelled in the meantime hands its message to
            // the next in line rather than losing it.
            if let Err(Ok(unclaimed)) = reply.send(Ok(message)) {
                queue.push_front(unclaimed);
            }
        }
    }
}
