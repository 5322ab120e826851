//! Federation integration tests.
//!
//! Drive the processors against a mocked database and a recording
//! queue: an inbound Follow must record the edge and queue an
//! `Accept(Follow)` addressed to the sender.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use fedipress_common::{ap_id_hash, domain_hash};
use fedipress_core::services::{ApContext, MessageKind, RecordingQueue};
use fedipress_db::entities::{account, follow};
use fedipress_db::repositories::{AccountRepository, KvRepository};
use fedipress_federation::{FollowActivity, InboxActivity};
use fedipress_federation::processor::FollowProcessor;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use url::Url;

fn account_model(id: &str, ap_id: &str, internal: bool) -> account::Model {
    let parsed = Url::parse(ap_id).unwrap();
    let domain = parsed.host_str().unwrap().to_string();
    account::Model {
        id: id.to_string(),
        uuid: Some(format!("uuid-{id}")),
        username: "index".to_string(),
        name: None,
        bio: None,
        avatar_url: None,
        banner_image_url: None,
        url: Some(ap_id.to_string()),
        ap_id: ap_id.to_string(),
        ap_id_hash: ap_id_hash(ap_id),
        ap_inbox_url: format!("{ap_id}/inbox"),
        ap_shared_inbox_url: None,
        ap_outbox_url: None,
        ap_followers_url: None,
        ap_following_url: None,
        ap_liked_url: None,
        ap_public_key: None,
        ap_private_key: internal.then(|| "pem".to_string()),
        domain: domain.clone(),
        domain_hash: domain_hash(&domain),
        created_at: Utc::now().into(),
        updated_at: None,
        deleted_at: None,
    }
}

#[tokio::test]
async fn test_inbound_follow_records_edge_and_queues_accept() {
    let alice = account_model("a-alice", "https://mastodon.example/users/alice", false);
    let site_default = account_model(
        "a-index",
        "https://blog.example/.ghost/activitypub/users/index",
        true,
    );

    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::MySql)
            // save: profile row update
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            // AccountFollowed: edge existence check (absent)
            .append_query_results([Vec::<follow::Model>::new()])
            // edge insert + fetch-back
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([[follow::Model {
                id: "f1".to_string(),
                follower_id: alice.id.clone(),
                following_id: site_default.id.clone(),
                created_at: Utc::now().into(),
            }]])
            // kv.set of the Accept activity (upsert)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection(),
    );

    let queue = Arc::new(RecordingQueue::new());
    let processor = FollowProcessor::new(
        AccountRepository::new(Arc::clone(&db)),
        KvRepository::new(db),
        queue.clone(),
    );

    let ctx = ApContext::new("blog.example");
    let activity = FollowActivity::new(
        Url::parse("https://mastodon.example/activities/follow-1").unwrap(),
        Url::parse(&alice.ap_id).unwrap(),
        Url::parse(&site_default.ap_id).unwrap(),
    );

    processor
        .process(&ctx, &activity, &alice, &site_default)
        .await
        .unwrap();

    // Exactly one Accept, targeting alice's inbox, addressed to her id.
    let messages = queue.messages().await;
    assert_eq!(messages.len(), 1);
    let accept = &messages[0];
    assert_eq!(accept.kind, MessageKind::Outbox);
    assert_eq!(accept.inbox.as_deref(), Some(alice.ap_inbox_url.as_str()));
    assert_eq!(accept.payload["type"], "Accept");
    assert_eq!(accept.payload["actor"], site_default.ap_id);
    assert_eq!(accept.payload["to"][0], alice.ap_id);
    assert_eq!(
        accept.payload["object"]["id"],
        "https://mastodon.example/activities/follow-1"
    );
    assert_eq!(accept.payload["object"]["type"], "Follow");
}

#[tokio::test]
async fn test_follow_replay_converges_to_one_edge() {
    let alice = account_model("a-alice", "https://mastodon.example/users/alice", false);
    let site_default = account_model(
        "a-index",
        "https://blog.example/.ghost/activitypub/users/index",
        true,
    );
    let existing_edge = follow::Model {
        id: "f1".to_string(),
        follower_id: alice.id.clone(),
        following_id: site_default.id.clone(),
        created_at: Utc::now().into(),
    };

    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::MySql)
            // save: profile row update
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            // AccountFollowed: edge already present, nothing inserted
            .append_query_results([[existing_edge]])
            // kv.set of the Accept activity
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection(),
    );

    let queue = Arc::new(RecordingQueue::new());
    let processor = FollowProcessor::new(
        AccountRepository::new(Arc::clone(&db)),
        KvRepository::new(db),
        queue.clone(),
    );

    let ctx = ApContext::new("blog.example");
    let activity = FollowActivity::new(
        Url::parse("https://mastodon.example/activities/follow-1").unwrap(),
        Url::parse(&alice.ap_id).unwrap(),
        Url::parse(&site_default.ap_id).unwrap(),
    );

    // The replayed Follow still succeeds and re-sends the Accept.
    processor
        .process(&ctx, &activity, &alice, &site_default)
        .await
        .unwrap();
    assert_eq!(queue.messages().await.len(), 1);
}

#[test]
fn test_undo_before_follow_parses_and_targets_edge() {
    // An Undo may arrive before the Follow it undoes; the dispatcher
    // must still classify it correctly from the embedded object.
    let raw = serde_json::json!({
        "id": "https://mastodon.example/activities/undo-1",
        "type": "Undo",
        "actor": "https://mastodon.example/users/alice",
        "object": {
            "id": "https://mastodon.example/activities/follow-1",
            "type": "Follow",
            "actor": "https://mastodon.example/users/alice",
            "object": "https://blog.example/.ghost/activitypub/users/index"
        }
    });
    let activity: InboxActivity = serde_json::from_value(raw).unwrap();
    assert_eq!(activity.activity_type(), "Undo");

    let InboxActivity::Undo(undo) = activity else {
        panic!("expected Undo");
    };
    assert_eq!(undo.object.object_type(), Some("Follow"));
}
