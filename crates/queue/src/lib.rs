//! Delivery queue for fedipress.
//!
//! Durable, at-least-once delivery of outbound activities over a
//! push-based pub/sub transport with a separate retry topic,
//! per-inbox backoff accounting, and pre-publish admission control.

pub mod classify;
pub mod memory;
pub mod push;
pub mod pubsub;
pub mod queue_impl;
pub mod trace;
pub mod worker;

pub use classify::{classify_delivery_error, Classification, DeliveryError};
pub use memory::InProcessQueue;
pub use push::{
    ErrorListener, MessageHandler, PushEnvelope, PushMessageHandler, PushStatus, RetryPublisher,
};
pub use pubsub::PubSubTopics;
pub use queue_impl::PubSubQueue;
pub use trace::current_trace_context;
pub use worker::DeliveryWorker;

/// Transport attribute carrying the queue message id end to end.
pub const MESSAGE_ID_ATTRIBUTE: &str = "fedifyId";
