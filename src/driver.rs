//! # Driver Contract
//!
//! The batch-oriented interface every backend adapter implements. The core
//! consumes these traits and never reimplements them: it turns per-message
//! caller operations into batched driver calls and fans the results back
//! out. One driver pair exists per backend (cloud queue, broker, or the
//! in-process [`mem`](crate::mem) loopback).

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque, backend-issued identifier for a received message.
///
/// The core never interprets the bytes; they are minted by a driver's
/// `receive_batch` and handed back verbatim to the same driver's
/// `send_acks`. Drivers are free to encode whatever their backend needs
/// (receipt handles, delivery tags, offsets).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AckToken(Vec<u8>);

impl AckToken {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// The message shape exchanged with drivers.
///
/// `ack_token` is populated by drivers on receive and ignored on send.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverMessage {
    pub body: Vec<u8>,
    pub attributes: HashMap<String, String>,
    pub ack_token: Option<AckToken>,
}

/// Batch send side of a backend adapter.
#[async_trait]
pub trait TopicDriver: Send + Sync {
    /// Publish an ordered batch of messages as a single backend call.
    ///
    /// Returns one outcome for the whole batch; the core propagates a
    /// failure verbatim to every member.
    async fn send_batch(&self, batch: Vec<DriverMessage>) -> Result<()>;

    /// Release the backend handle. Called once, after the owning topic has
    /// stopped dispatching.
    async fn close(&self) -> Result<()>;
}

/// Batch receive/ack side of a backend adapter.
#[async_trait]
pub trait SubscriptionDriver: Send + Sync {
    /// Fetch the next batch of messages, blocking until at least one is
    /// available. An empty batch is treated as "nothing yet" and triggers
    /// another fetch.
    async fn receive_batch(&self) -> Result<Vec<DriverMessage>>;

    /// Acknowledge a batch of previously received messages.
    ///
    /// Backends without an acknowledgement concept should return a
    /// [`DriverBatch`](crate::error::Error::DriverBatch) error here rather
    /// than pretending to succeed; the core never simulates acks.
    async fn send_acks(&self, tokens: Vec<AckToken>) -> Result<()>;

    /// Release the backend handle. Called once, after the owning
    /// subscription's workers have stopped.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl<D: TopicDriver + ?Sized> TopicDriver for Arc<D> {
    async fn send_batch(&self, batch: Vec<DriverMessage>) -> Result<()> {
        (**self).send_batch(batch).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}

#[async_trait]
impl<D: SubscriptionDriver + ?Sized> SubscriptionDriver for Arc<D> {
    async fn receive_batch(&self) -> Result<Vec<DriverMessage>> {
        (**self).receive_batch().await
    }

    async fn send_acks(&self, tokens: Vec<AckToken>) -> Result<()> {
        (**self).send_acks(tokens).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
