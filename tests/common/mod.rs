//! Shared fake drivers for integration tests.
//!
//! `RecordingTopicDriver` captures every dispatched send batch and can be
//! scripted to fail; `ScriptedSubscriptionDriver` replays a fixed sequence
//! of fetch results (blocking forever once the script runs out, like a
//! quiet backend) and records ack batches.

#![allow(dead_code)] // not every test binary uses every helper

use async_trait::async_trait;
use mqport::{AckToken, DriverMessage, Error, Result, SubscriptionDriver, TopicDriver};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

pub fn msg(body: &str) -> mqport::Message {
    mqport::Message::new(body.as_bytes().to_vec())
}

pub fn driver_msg(body: &str) -> DriverMessage {
    DriverMessage {
        body: body.as_bytes().to_vec(),
        ..Default::default()
    }
}

pub fn driver_msg_with_token(body: &str) -> DriverMessage {
    DriverMessage {
        body: body.as_bytes().to_vec(),
        attributes: Default::default(),
        ack_token: Some(AckToken::new(format!("token-{body}").into_bytes())),
    }
}

#[derive(Default)]
pub struct RecordingTopicDriver {
    pub batches: Mutex<Vec<Vec<DriverMessage>>>,
    pub fail_sends_with: Mutex<Option<Error>>,
    pub close_calls: AtomicUsize,
}

impl RecordingTopicDriver {
    pub fn failing(error: Error) -> Self {
        Self {
            fail_sends_with: Mutex::new(Some(error)),
            ..Default::default()
        }
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn bodies(&self, batch: usize) -> Vec<Vec<u8>> {
        self.batches.lock()[batch]
            .iter()
            .map(|m| m.body.clone())
            .collect()
    }
}

#[async_trait]
impl TopicDriver for RecordingTopicDriver {
    async fn send_batch(&self, batch: Vec<DriverMessage>) -> Result<()> {
        self.batches.lock().push(batch);
        match self.fail_sends_with.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct ScriptedSubscriptionDriver {
    script: Mutex<VecDeque<Result<Vec<DriverMessage>>>>,
    /// Fetches wait for a permit when the driver is gated.
    gate: Option<Semaphore>,
    pub receive_calls: AtomicUsize,
    pub ack_batches: Mutex<Vec<Vec<AckToken>>>,
    pub fail_acks_with: Mutex<Option<Error>>,
    pub close_calls: AtomicUsize,
}

impl ScriptedSubscriptionDriver {
    pub fn new(script: Vec<Result<Vec<DriverMessage>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            gate: None,
            receive_calls: AtomicUsize::new(0),
            ack_batches: Mutex::new(Vec::new()),
            fail_acks_with: Mutex::new(None),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Like [`new`](Self::new), but each fetch blocks until the test
    /// releases it via [`release_fetch`](Self::release_fetch).
    pub fn gated(script: Vec<Result<Vec<DriverMessage>>>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(script)
        }
    }

    pub fn release_fetch(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }

    pub fn ack_batch_count(&self) -> usize {
        self.ack_batches.lock().len()
    }
}

#[async_trait]
impl SubscriptionDriver for ScriptedSubscriptionDriver {
    async fn receive_batch(&self) -> Result<Vec<DriverMessage>> {
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(result) => result,
            // Script exhausted: behave like a backend with nothing to say.
            None => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn send_acks(&self, tokens: Vec<AckToken>) -> Result<()> {
        self.ack_batches.lock().push(tokens);
        match self.fail_acks_with.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
