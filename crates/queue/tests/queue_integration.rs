//! Queue integration tests.
//!
//! Exercise the push-envelope protocol, retry routing, permanent
//! failure accounting and enqueue admission control against an
//! in-process transport and a mocked database.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use fedipress_common::{ap_id_hash, AppResult};
use fedipress_core::services::{MessageQueue, QueueMessage};
use fedipress_db::entities::delivery_backoff;
use fedipress_db::repositories::DeliveryBackoffRepository;
use fedipress_queue::{
    DeliveryError, InProcessQueue, MessageHandler, PushMessageHandler, RetryPublisher,
    MESSAGE_ID_ATTRIBUTE,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use serde_json::json;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

const INBOX: &str = "https://broken.example/inbox";

fn backoff_record(failures: i32, minutes_from_now: i64) -> delivery_backoff::Model {
    delivery_backoff::Model {
        id: "b1".to_string(),
        inbox_url: INBOX.to_string(),
        inbox_url_hash: ap_id_hash(INBOX),
        failure_count: failures,
        backoff_until: (Utc::now() + chrono::Duration::minutes(minutes_from_now)).into(),
        last_error: Some("(403 Forbidden)".to_string()),
        updated_at: Utc::now().into(),
    }
}

fn empty_backoff_db() -> Arc<DatabaseConnection> {
    Arc::new(
        MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([Vec::<delivery_backoff::Model>::new()])
            .into_connection(),
    )
}

fn outbox_message(id: &str) -> QueueMessage {
    QueueMessage::outbox(
        id.to_string(),
        INBOX.to_string(),
        json!({"type": "Create", "actor": "https://blog.example/.ghost/activitypub/users/index"}),
    )
}

fn envelope_for(message: &QueueMessage) -> Vec<u8> {
    let data = BASE64.encode(serde_json::to_vec(message).unwrap());
    serde_json::to_vec(&json!({
        "message": {
            "message_id": message.id,
            "data": data,
            "attributes": { "fedifyId": message.id },
        }
    }))
    .unwrap()
}

/// Handler returning a preconfigured result, recording every call.
struct ScriptedHandler {
    result: Mutex<Option<DeliveryError>>,
    calls: AtomicUsize,
}

impl ScriptedHandler {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(error: DeliveryError) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Some(error)),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MessageHandler for ScriptedHandler {
    async fn handle(&self, _message: QueueMessage) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.result.lock().await {
            None => Ok(()),
            Some(error) => Err(error.clone()),
        }
    }
}

#[derive(Default)]
struct RecordingRetry {
    republished: Mutex<Vec<(String, HashMap<String, String>)>>,
}

#[async_trait]
impl RetryPublisher for RecordingRetry {
    async fn republish(&self, data: &str, attributes: &HashMap<String, String>) -> AppResult<()> {
        self.republished
            .lock()
            .await
            .push((data.to_string(), attributes.clone()));
        Ok(())
    }
}

#[tokio::test]
async fn test_not_listening_returns_429() {
    let handler = PushMessageHandler::new(
        ScriptedHandler::ok(),
        DeliveryBackoffRepository::new(empty_backoff_db()),
        None,
    );

    let status = handler.handle_push(&envelope_for(&outbox_message("m1"))).await;
    assert_eq!(status.code(), 429);
}

#[tokio::test]
async fn test_malformed_envelope_returns_400() {
    let handler = PushMessageHandler::new(
        ScriptedHandler::ok(),
        DeliveryBackoffRepository::new(empty_backoff_db()),
        None,
    );
    handler.set_listening(true);

    assert_eq!(handler.handle_push(b"not json").await.code(), 400);
    assert_eq!(
        handler
            .handle_push(br#"{"message":{"message_id":"x","data":"!!!not-base64!!!"}}"#)
            .await
            .code(),
        400
    );
}

#[tokio::test]
async fn test_success_clears_backoff_and_returns_200() {
    // clear() issues one delete.
    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection(),
    );
    let scripted = ScriptedHandler::ok();
    let handler = PushMessageHandler::new(
        scripted.clone(),
        DeliveryBackoffRepository::new(db),
        None,
    );
    handler.set_listening(true);

    let status = handler.handle_push(&envelope_for(&outbox_message("m1"))).await;
    assert_eq!(status.code(), 200);
    assert_eq!(scripted.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retryable_error_republishes_to_retry_topic() {
    let retry = Arc::new(RecordingRetry::default());
    let errors = Arc::new(AtomicUsize::new(0));
    let errors_clone = Arc::clone(&errors);

    let handler = PushMessageHandler::new(
        ScriptedHandler::failing(DeliveryError::Http {
            status: 502,
            reason: "Bad Gateway".to_string(),
        }),
        DeliveryBackoffRepository::new(empty_backoff_db()),
        Some(retry.clone()),
    )
    .with_error_listener(Arc::new(move |_| {
        errors_clone.fetch_add(1, Ordering::SeqCst);
    }));
    handler.set_listening(true);

    let message = outbox_message("m-retry");
    let status = handler.handle_push(&envelope_for(&message)).await;

    // Consumed (200) so the transport does not retry at its own cadence.
    assert_eq!(status.code(), 200);
    let republished = retry.republished.lock().await;
    assert_eq!(republished.len(), 1);
    assert_eq!(
        republished[0].1.get(MESSAGE_ID_ATTRIBUTE).map(String::as_str),
        Some("m-retry")
    );
    // The error listener fired exactly once.
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retryable_error_without_retry_topic_returns_500() {
    let handler = PushMessageHandler::new(
        ScriptedHandler::failing(DeliveryError::Timeout(INBOX.to_string())),
        DeliveryBackoffRepository::new(empty_backoff_db()),
        None,
    )
    .with_error_listener(Arc::new(|_| {}));
    handler.set_listening(true);

    let status = handler.handle_push(&envelope_for(&outbox_message("m1"))).await;
    assert_eq!(status.code(), 500);
}

#[tokio::test]
async fn test_permanent_error_records_failure_without_republish() {
    // record_failure: find (none) then insert + fetch-back.
    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([Vec::<delivery_backoff::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([[backoff_record(1, 1)]])
            .into_connection(),
    );
    let retry = Arc::new(RecordingRetry::default());

    let handler = PushMessageHandler::new(
        ScriptedHandler::failing(DeliveryError::Other("(403 Forbidden)".to_string())),
        DeliveryBackoffRepository::new(db),
        Some(retry.clone()),
    )
    .with_error_listener(Arc::new(|_| {}));
    handler.set_listening(true);

    let status = handler.handle_push(&envelope_for(&outbox_message("m1"))).await;
    assert_eq!(status.code(), 200);
    // The retry topic received nothing.
    assert!(retry.republished.lock().await.is_empty());
}

#[tokio::test]
async fn test_enqueue_drops_message_for_inbox_under_backoff() {
    // get_active returns a live record: admission control drops.
    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([[backoff_record(3, 25)]])
            .into_connection(),
    );
    let queue = InProcessQueue::new(DeliveryBackoffRepository::new(db));

    let scripted = ScriptedHandler::ok();
    let handler = Arc::new(PushMessageHandler::new(
        scripted.clone(),
        DeliveryBackoffRepository::new(empty_backoff_db()),
        None,
    ));

    let cancel = CancellationToken::new();
    let listener = {
        let queue = queue.clone();
        let handler = Arc::clone(&handler);
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.listen(handler, cancel).await })
    };

    queue.enqueue(outbox_message("m-dropped")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    listener.await.unwrap().unwrap();

    // Nothing was published, so the handler never ran.
    assert_eq!(scripted.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_enqueue_delivers_when_no_backoff() {
    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([Vec::<delivery_backoff::Model>::new()])
            .into_connection(),
    );
    let queue = InProcessQueue::new(DeliveryBackoffRepository::new(db));

    let scripted = ScriptedHandler::ok();
    // Success path clears backoff: one delete exec.
    let handler_db = Arc::new(
        MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection(),
    );
    let handler = Arc::new(PushMessageHandler::new(
        scripted.clone(),
        DeliveryBackoffRepository::new(handler_db),
        None,
    ));

    let cancel = CancellationToken::new();
    let listener = {
        let queue = queue.clone();
        let handler = Arc::clone(&handler);
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.listen(handler, cancel).await })
    };

    queue.enqueue(outbox_message("m-live")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    listener.await.unwrap().unwrap();

    assert_eq!(scripted.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_trace_context_injected_on_enqueue() {
    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([Vec::<delivery_backoff::Model>::new()])
            .into_connection(),
    );
    let queue = InProcessQueue::new(DeliveryBackoffRepository::new(db));

    // Capture the decoded message inside the handler.
    struct Capture {
        seen: Mutex<Vec<QueueMessage>>,
    }
    #[async_trait]
    impl MessageHandler for Capture {
        async fn handle(&self, message: QueueMessage) -> Result<(), DeliveryError> {
            self.seen.lock().await.push(message);
            Ok(())
        }
    }
    let capture = Arc::new(Capture {
        seen: Mutex::new(Vec::new()),
    });
    let handler = Arc::new(PushMessageHandler::new(
        capture.clone(),
        DeliveryBackoffRepository::new(Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        )),
        None,
    ));

    let cancel = CancellationToken::new();
    let listener = {
        let queue = queue.clone();
        let handler = Arc::clone(&handler);
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.listen(handler, cancel).await })
    };

    queue.enqueue(outbox_message("m-trace")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    listener.await.unwrap().unwrap();

    let seen = capture.seen.lock().await;
    assert_eq!(seen.len(), 1);
    let trace = seen[0].trace_context.clone().unwrap();
    assert!(trace.traceparent.unwrap().starts_with("00-"));
    assert!(trace.sentry_trace.is_some());
}
