//! Inbox dispatcher: the federated POST endpoint.
//!
//! Order of operations: signature verification (401), schema parse
//! (400), publicness filter for Create, sender resolution (202 on
//! failure), moderation (silent drop), dispatch by type, KV mirror.
//! Disabled tenants answer 403 before any of it.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use fedipress_common::AppError;
use fedipress_core::services::{ApContext, QueueService, SiteService};
use fedipress_db::entities::{account, site};
use fedipress_db::repositories::{AccountRepository, KvRepository, PostRepository, SiteRepository};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::activities::InboxActivity;
use crate::client::DocumentLoader;
use crate::processor::{
    ActorFetcher, AnnounceProcessor, CreateProcessor, DeleteProcessor, FollowProcessor,
    LikeProcessor, UndoProcessor,
};
use crate::signature::{claimed_key_id, verify_inbox_request};

/// State required for the inbox dispatcher.
#[derive(Clone)]
pub struct InboxState {
    pub site_service: SiteService,
    pub account_repo: AccountRepository,
    pub post_repo: PostRepository,
    pub site_repo: SiteRepository,
    pub kv: KvRepository,
    pub queue: QueueService,
    pub loader: DocumentLoader,
}

/// Handle a federated POST to a tenant inbox.
pub async fn inbox_handler(
    State(state): State<InboxState>,
    Path(handle): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    match dispatch(&state, &handle, &headers, &body).await {
        Ok(status) => status,
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() {
                error!(error = %e, "Inbox dispatch failed");
            } else {
                debug!(error = %e, "Inbox request rejected");
            }
            status
        }
    }
}

async fn dispatch(
    state: &InboxState,
    handle: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<StatusCode, AppError> {
    let host = super::request_host(headers)?;
    let site = state.site_service.require_enabled(&host).await?;
    let site_default = state.account_repo.get_by_site(&site.id).await?;
    let ctx = ApContext::new(&site.host);

    // 1. Signature verification.
    let key_id = claimed_key_id(headers)?;
    let public_key = state
        .loader
        .fetch_public_key(&key_id)
        .await
        .map_err(|_| AppError::SignatureInvalid)?;
    let path = format!("{}/inbox/{handle}", ApContext::PREFIX);
    verify_inbox_request(headers, "POST", &path, body, &public_key)?;

    // 2. Schema parse.
    let activity: InboxActivity = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Malformed activity: {e}")))?;
    let raw: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Malformed activity: {e}")))?;

    info!(
        activity_type = activity.activity_type(),
        actor = ?activity.actor().map(url::Url::as_str),
        host = %site.host,
        "Received activity"
    );

    let InboxActivity::Unknown(_) = &activity else {
        return process_known(state, &ctx, &site, &site_default, &key_id, activity, raw).await;
    };
    // Unknown types are acknowledged and dropped.
    warn!("Received unknown activity type");
    Ok(StatusCode::ACCEPTED)
}

#[allow(clippy::too_many_lines)]
async fn process_known(
    state: &InboxState,
    ctx: &ApContext,
    _site: &site::Model,
    site_default: &account::Model,
    key_id: &str,
    activity: InboxActivity,
    raw: Value,
) -> Result<StatusCode, AppError> {
    // 3. Publicness filter for Create: ack and drop non-public posts.
    if let InboxActivity::Create(create) = &activity {
        if !create.is_public() {
            debug!(id = %create.id, "Dropping non-public Create");
            return Ok(StatusCode::ACCEPTED);
        }
    }

    // 4. Resolve the sender. The signing key must belong to the actor
    // the activity claims.
    let Some(actor_url) = activity.actor().cloned() else {
        return Ok(StatusCode::ACCEPTED);
    };
    let key_owner = key_id.split('#').next().unwrap_or(key_id);
    if key_owner != actor_url.as_str() {
        debug!(key = %key_id, actor = %actor_url, "Key owner does not match actor");
        return Err(AppError::SignatureInvalid);
    }

    let fetcher = ActorFetcher::new(state.account_repo.clone(), state.loader.clone());
    let sender = match fetcher.find_or_fetch(&actor_url).await {
        Ok(sender) => sender,
        Err(e) => {
            // Best-effort: an unreachable actor is not our failure.
            warn!(actor = %actor_url, error = %e, "Could not resolve sender");
            return Ok(StatusCode::ACCEPTED);
        }
    };

    // 5. Moderation: silently drop blocked senders and domains.
    if state.account_repo.blocks(&site_default.id, &sender.id).await?
        || state
            .account_repo
            .blocks_domain(&site_default.id, &sender.domain)
            .await?
    {
        debug!(sender = %sender.ap_id, "Dropping activity from blocked sender");
        return Ok(StatusCode::ACCEPTED);
    }

    // 6. Dispatch by type.
    match &activity {
        InboxActivity::Follow(follow) => {
            let processor = FollowProcessor::new(
                state.account_repo.clone(),
                state.kv.clone(),
                state.queue.clone(),
            );
            processor.process(ctx, follow, &sender, site_default).await?;
        }
        InboxActivity::Accept(accept) => {
            // No state change beyond the KV record written below.
            debug!(id = %accept.id, "Accept acknowledged");
        }
        InboxActivity::Undo(undo) => {
            let processor = UndoProcessor::new(
                state.account_repo.clone(),
                state.post_repo.clone(),
                state.kv.clone(),
                state.loader.clone(),
            );
            processor.process(undo, &sender, site_default).await?;
        }
        InboxActivity::Create(create) => {
            let processor = CreateProcessor::new(
                state.account_repo.clone(),
                state.post_repo.clone(),
                state.site_repo.clone(),
                state.kv.clone(),
            );
            processor.process(ctx, create, &sender, site_default).await?;
        }
        InboxActivity::Like(like) => {
            let processor = LikeProcessor::new(state.post_repo.clone());
            processor.process(like, &sender).await?;
        }
        InboxActivity::Announce(announce) => {
            let processor = AnnounceProcessor::new(
                state.post_repo.clone(),
                fetcher.clone(),
                state.loader.clone(),
            );
            processor.process(announce, &sender).await?;
        }
        InboxActivity::Delete(delete) => {
            let processor =
                DeleteProcessor::new(state.account_repo.clone(), state.post_repo.clone());
            processor.process(delete, &sender).await?;
        }
        InboxActivity::Unknown(_) => {}
    }

    // 7. Mirror the verbatim activity by its canonical id.
    if let Some(id) = activity.id() {
        state.kv.set(id.as_str(), raw).await?;
    }

    Ok(StatusCode::ACCEPTED)
}
