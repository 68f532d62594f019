//! # Batching Engine
//!
//! Shared machinery behind topic sends and subscription acks. Callers hand
//! individual requests to a single background worker over an mpsc channel;
//! the worker assembles them into batches under a [`BatchPolicy`],
//! dispatches each batch once, and broadcasts the batch outcome back
//! through per-request oneshot completion slots.
//!
//! All mutable batch state lives inside the worker task. Caller tasks only
//! enqueue requests and wait on their slots, which makes batch-formation
//! decisions race-free without locking.

use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Flush policy: a batch is dispatched once it holds `max_size` entries or
/// once `delay` has elapsed since its first entry arrived, whichever comes
/// first.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BatchPolicy {
    pub delay: Duration,
    pub max_size: usize,
}

impl BatchPolicy {
    /// Degenerate policies (zero size or zero delay) flush on every entry.
    fn coalesces(&self) -> bool {
        self.max_size > 1 && !self.delay.is_zero()
    }
}

/// One queued request: the item to batch plus the completion slot through
/// which exactly one caller learns the batch outcome.
pub(crate) struct Pending<T> {
    pub item: T,
    pub done: oneshot::Sender<Result<()>>,
}

/// Dispatch target for assembled batches. Implemented over a topic driver
/// for sends and over a subscription driver for acks.
#[async_trait]
pub(crate) trait BatchDispatcher: Send + 'static {
    type Item: Send + 'static;

    async fn dispatch(&mut self, items: Vec<Self::Item>) -> Result<()>;
}

/// Handle to one background batching worker.
pub(crate) struct Batcher<T> {
    requests: Mutex<Option<mpsc::UnboundedSender<Pending<T>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Batcher<T> {
    /// Spawn the worker and return the caller-facing handle.
    pub fn start<D>(policy: BatchPolicy, dispatcher: D) -> Self
    where
        D: BatchDispatcher<Item = T>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run(policy, rx, dispatcher));
        Self {
            requests: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue one item and wait for its batch's outcome.
    ///
    /// Cancel-safe: dropping the returned future abandons the completion
    /// slot, and the worker discards the entry if its batch has not been
    /// dispatched yet.
    pub async fn submit(&self, item: T) -> Result<()> {
        let (done, outcome) = oneshot::channel();
        {
            let guard = self.requests.lock();
            let requests = guard.as_ref().ok_or(Error::Closed)?;
            requests
                .send(Pending { item, done })
                .map_err(|_| Error::Closed)?;
        }
        outcome.await.unwrap_or(Err(Error::Closed))
    }

    /// Stop accepting work, let the worker flush whatever it holds, and
    /// wait for it to exit. Returns false if a previous call already shut
    /// the batcher down.
    pub async fn shutdown(&self) -> bool {
        let requests = self.requests.lock().take();
        if requests.is_none() {
            return false;
        }
        drop(requests);
        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            let _ = handle.await;
        }
        true
    }

    pub fn is_open(&self) -> bool {
        self.requests.lock().is_some()
    }
}

async fn run<D: BatchDispatcher>(
    policy: BatchPolicy,
    mut rx: mpsc::UnboundedReceiver<Pending<D::Item>>,
    mut dispatcher: D,
) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        if policy.coalesces() {
            let window = tokio::time::sleep(policy.delay);
            tokio::pin!(window);
            while batch.len() < policy.max_size {
                tokio::select! {
                    _ = &mut window => break,
                    next = rx.recv() => match next {
                        Some(pending) => batch.push(pending),
                        // Channel closed: flush what we have and exit via
                        // the outer recv.
                        None => break,
                    },
                }
            }
        }
        flush(&mut dispatcher, batch).await;
    }
}

async fn flush<D: BatchDispatcher>(dispatcher: &mut D, batch: Vec<Pending<D::Item>>) {
    // Entries whose caller stopped waiting before dispatch are dropped from
    // the batch; once dispatched, a batch completes for all remaining
    // members regardless of later cancellations.
    let (items, slots): (Vec<_>, Vec<_>) = batch
        .into_iter()
        .filter(|pending| !pending.done.is_closed())
        .map(|pending| (pending.item, pending.done))
        .unzip();
    if items.is_empty() {
        return;
    }

    debug!(batch_len = items.len(), "dispatching batch");
    let outcome = dispatcher.dispatch(items).await;
    if let Err(error) = &outcome {
        debug!(%error, "batch dispatch failed");
    }
    for slot in slots {
        // A receiver dropped mid-dispatch just stops listening.
        let _ = slot.send(outcome.clone());
    }
}
