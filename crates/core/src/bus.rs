//! In-process event bus.
//!
//! Repositories publish committed domain events here; projections
//! subscribe at startup. Subscribers run in registration order, and a
//! failing subscriber never blocks the others or the primary write.
//! Its error is logged and reported.

use std::sync::Arc;

use async_trait::async_trait;
use fedipress_common::AppResult;
use fedipress_db::domain::{DomainEvent, EventSink};
use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::{debug, error};

type SubscriberFn = Box<dyn Fn(DomainEvent) -> BoxFuture<'static, AppResult<()>> + Send + Sync>;

struct Subscriber {
    name: &'static str,
    handler: SubscriberFn,
}

/// Single-process publish/subscribe for domain events.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Dispatch order is registration order.
    pub async fn subscribe<F>(&self, name: &'static str, handler: F)
    where
        F: Fn(DomainEvent) -> BoxFuture<'static, AppResult<()>> + Send + Sync + 'static,
    {
        self.subscribers.write().await.push(Subscriber {
            name,
            handler: Box::new(handler),
        });
    }

    /// Number of registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

#[async_trait]
impl EventSink for EventBus {
    async fn publish(&self, event: DomainEvent) {
        let subscribers = self.subscribers.read().await;
        debug!(
            event = ?event,
            subscribers = subscribers.len(),
            "Dispatching domain event"
        );
        for subscriber in subscribers.iter() {
            if let Err(e) = (subscriber.handler)(event.clone()).await {
                error!(
                    subscriber = subscriber.name,
                    error = %e,
                    "Event subscriber failed"
                );
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use fedipress_common::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn follow_event() -> DomainEvent {
        DomainEvent::AccountFollowed {
            follower_id: "a1".to_string(),
            following_id: "a2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_subscribers_run_in_registration_order() {
        let bus = Arc::new(EventBus::new());
        let order = Arc::new(RwLock::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe(name, move |_| {
                let order = Arc::clone(&order);
                Box::pin(async move {
                    order.write().await.push(name);
                    Ok(())
                })
            })
            .await;
        }

        bus.publish(follow_event()).await;
        assert_eq!(*order.read().await, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_failing_subscriber_does_not_block_others() {
        let bus = Arc::new(EventBus::new());
        let calls = Arc::new(AtomicUsize::new(0));

        bus.subscribe("failing", |_| {
            Box::pin(async { Err(AppError::Internal("boom".to_string())) })
        })
        .await;

        let calls_clone = Arc::clone(&calls);
        bus.subscribe("counting", move |_| {
            let calls = Arc::clone(&calls_clone);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .await;

        bus.publish(follow_event()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
