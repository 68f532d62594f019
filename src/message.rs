//! # Message Entity
//!
//! The unit of data flowing through the layer. Outgoing messages are built
//! by callers and carry no ack token; received messages carry the driver's
//! token plus a non-owning reference back to the subscription that produced
//! them, so acknowledgement can be routed to that subscription's ack
//! batcher without keeping the subscription alive.

use crate::driver::{AckToken, DriverMessage};
use crate::error::{Error, Result};
use crate::subscription::SubscriptionInner;
use std::collections::HashMap;
use std::fmt;
use std::sync::Weak;
use std::time::Duration;

pub struct Message {
    body: Vec<u8>,
    attributes: HashMap<String, String>,
    ack_token: Option<AckToken>,
    origin: Weak<SubscriptionInner>,
}

impl Message {
    /// Build an outgoing message.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            attributes: HashMap::new(),
            ack_token: None,
            origin: Weak::new(),
        }
    }

    /// Attach one attribute, replacing any previous value for the key.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Attach a whole attribute map, replacing existing keys on collision.
    pub fn with_attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Whether this message was produced by `receive` and still holds an
    /// unconsumed ack token routed to a live subscription.
    pub fn can_ack(&self) -> bool {
        self.ack_token.is_some() && self.origin.strong_count() > 0
    }

    /// Acknowledge the message, consuming it.
    ///
    /// The token joins the origin subscription's pending ack batch; the
    /// call resolves once that batch has been dispatched. Acknowledging a
    /// message that was never received (or whose subscription no longer
    /// exists) is [`Error::CallerMisuse`]; taking `self` by value makes a
    /// second acknowledgement unrepresentable.
    pub async fn ack(mut self) -> Result<()> {
        let token = self.ack_token.take().ok_or_else(|| {
            Error::misuse("message carries no ack token; only messages obtained via receive can be acknowledged")
        })?;
        let origin = self
            .origin
            .upgrade()
            .ok_or_else(|| Error::misuse("message's origin subscription no longer exists"))?;
        origin.ack(token).await
    }

    /// [`ack`](Self::ack) with a deadline; elapsing yields
    /// [`Error::Cancelled`] while the batch dispatch proceeds without the
    /// caller.
    pub async fn ack_timeout(self, deadline: Duration) -> Result<()> {
        tokio::time::timeout(deadline, self.ack())
            .await
            .map_err(|_| Error::Cancelled)?
    }

    /// Wrap a driver batch member, wiring the ack route back to its
    /// subscription.
    pub(crate) fn from_driver(raw: DriverMessage, origin: Weak<SubscriptionInner>) -> Self {
        Self {
            body: raw.body,
            attributes: raw.attributes,
            ack_token: raw.ack_token,
            origin,
        }
    }

    /// Strip down to the driver shape for sending. Any ack token is
    /// deliberately dropped: republishing a received message sends its
    /// content, not its receipt.
    pub(crate) fn into_driver(self) -> DriverMessage {
        DriverMessage {
            body: self.body,
            attributes: self.attributes,
            ack_token: None,
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("body_len", &self.body.len())
            .field("attributes", &self.attributes)
            .field("acknowledgeable", &self.can_ack())
            .finish()
    }
}
