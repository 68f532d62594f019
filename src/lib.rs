#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # mqport
//!
//! A portability layer over heterogeneous publish/subscribe backends.
//! Callers get a uniform, per-message async API (send one message,
//! receive one message, acknowledge one message) while backend adapters
//! ("drivers") operate in batches for efficiency.
//!
//! ## Architecture
//!
//! The core is a translation engine between the two shapes:
//!
//! - **Send batching**: concurrent `send` calls are coalesced into time-
//!   or size-bounded batches and dispatched as single driver calls, with
//!   the batch outcome fanned back out to every caller.
//! - **Receive buffering**: messages are fetched from the driver in
//!   batches into a local FIFO queue and handed out one at a time; an
//!   empty queue triggers exactly one fetch no matter how many callers
//!   are waiting.
//! - **Ack batching**: per-message acknowledgements are routed back to
//!   the originating subscription and coalesced like sends.
//!
//! Each [`Topic`] and [`Subscription`] owns its background worker tasks;
//! callers communicate with them only through channels, so all batch and
//! queue state has a single owner and batch decisions are race-free.
//!
//! ## Module Organization
//!
//! - [`driver`] - the batch-oriented contract backend adapters implement
//! - [`topic`] / [`subscription`] - the caller-facing per-message API
//! - [`message`] - the message entity and acknowledgement routing
//! - [`config`] - batching delays and sizes, with env overrides
//! - [`error`] - structured error types
//! - [`mem`] - in-process loopback driver
//! - [`logging`] - opt-in tracing setup for binaries and tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mqport::mem::MemBroker;
//! use mqport::{Message, Subscription, SubscriptionOptions, Topic, TopicOptions};
//!
//! # async fn example() -> mqport::Result<()> {
//! let broker = MemBroker::new();
//! let topic = Topic::new(broker.topic_driver(), TopicOptions::default());
//! let subscription =
//!     Subscription::new(broker.subscription_driver(), SubscriptionOptions::default());
//!
//! topic.send(Message::new(b"hello".to_vec()).with_attribute("k", "v")).await?;
//!
//! let message = subscription.receive().await?;
//! assert_eq!(message.body(), b"hello");
//! message.ack().await?;
//!
//! topic.close().await?;
//! subscription.close().await?;
//! # Ok(())
//! # }
//! ```

mod batcher;

pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod mem;
pub mod message;
pub mod subscription;
pub mod topic;

pub use config::{SubscriptionOptions, TopicOptions};
pub use driver::{AckToken, DriverMessage, SubscriptionDriver, TopicDriver};
pub use error::{Error, Result};
pub use message::Message;
pub use subscription::Subscription;
pub use topic::Topic;
