//! Blog webhook endpoints.
//!
//! Verification order: signature timestamp and HMAC (401, empty body),
//! then schema (400), then dispatch to the outbox service. The HMAC is
//! computed over `body || t` with the tenant's webhook secret.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fedipress_common::{verify_webhook_signature, AppError, AppResult};
use fedipress_core::services::{GhostPost, PublishOutcome, WebhookBody};
use fedipress_db::entities::site;
use serde_json::json;
use tracing::{debug, info};

use crate::response::PostResponse;
use crate::state::ApiState;

/// Signature header carried by blog webhooks.
const SIGNATURE_HEADER: &str = "x-ghost-signature";

async fn verified_body(
    state: &ApiState,
    headers: &HeaderMap,
    body: &[u8],
) -> AppResult<(site::Model, WebhookBody)> {
    let site = state.resolve_site(headers).await?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::SignatureInvalid)?;
    verify_webhook_signature(
        signature,
        &site.webhook_secret,
        body,
        state.webhook_tolerance_secs,
    )?;

    let parsed: WebhookBody = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Malformed webhook body: {e}")))?;
    Ok((site, parsed))
}

fn current_post(body: WebhookBody) -> AppResult<GhostPost> {
    body.post
        .current
        .ok_or_else(|| AppError::BadRequest("Webhook has no current post".to_string()))
}

fn outcome_response(outcome: PublishOutcome) -> Response {
    match outcome {
        PublishOutcome::Published(post) | PublishOutcome::Updated(post) => {
            Json(PostResponse::from(post)).into_response()
        }
        PublishOutcome::AlreadyExists => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": { "code": "post-already-exists", "message": "Post already federated" }
            })),
        )
            .into_response(),
        PublishOutcome::PrivateContent { deleted_existing }
        | PublishOutcome::MissingContent { deleted_existing } => {
            debug!(deleted_existing, "Webhook content not federatable");
            StatusCode::OK.into_response()
        }
        PublishOutcome::Deleted => StatusCode::OK.into_response(),
        PublishOutcome::NotFound => StatusCode::NOT_FOUND.into_response(),
    }
}

/// POST `/webhooks/post/published`.
pub async fn post_published_webhook(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (site, parsed) = match verified_body(&state, &headers, &body).await {
        Ok(verified) => verified,
        Err(e) => return e.into_response(),
    };
    let post = match current_post(parsed) {
        Ok(post) => post,
        Err(e) => return e.into_response(),
    };

    info!(host = %site.host, uuid = %post.uuid, "Publish webhook received");
    match state.outbox.publish_article_from_webhook(&site, &post).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => e.into_response(),
    }
}

/// POST `/webhooks/post/updated`.
pub async fn post_updated_webhook(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (site, parsed) = match verified_body(&state, &headers, &body).await {
        Ok(verified) => verified,
        Err(e) => return e.into_response(),
    };
    let post = match current_post(parsed) {
        Ok(post) => post,
        Err(e) => return e.into_response(),
    };

    info!(host = %site.host, uuid = %post.uuid, "Update webhook received");
    match state.outbox.update_article_from_webhook(&site, &post).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => e.into_response(),
    }
}

/// POST `/webhooks/post/deleted`.
///
/// Deletion webhooks carry the removed post in `previous` and an empty
/// `current`.
pub async fn post_deleted_webhook(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (site, parsed) = match verified_body(&state, &headers, &body).await {
        Ok(verified) => verified,
        Err(e) => return e.into_response(),
    };
    let uuid = parsed
        .post
        .previous
        .as_ref()
        .map(|p| p.uuid.clone())
        .or_else(|| parsed.post.current.as_ref().map(|p| p.uuid.clone()));
    let Some(uuid) = uuid else {
        return AppError::BadRequest("Webhook has no post uuid".to_string()).into_response();
    };

    info!(host = %site.host, uuid = %uuid, "Delete webhook received");
    match state.outbox.delete_article_from_webhook(&site, &uuid).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => e.into_response(),
    }
}
