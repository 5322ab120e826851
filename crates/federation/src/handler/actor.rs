//! Actor document handler.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fedipress_common::AppError;
use fedipress_core::services::context::activitystreams_context;
use fedipress_core::services::{ApContext, SiteService};
use fedipress_db::repositories::AccountRepository;
use serde_json::json;

use super::collections::CollectionState;

/// GET `/users/{handle}`: the tenant's actor document.
pub async fn actor_handler(
    State(state): State<CollectionState>,
    Path(handle): Path<String>,
    headers: HeaderMap,
) -> Response {
    match actor_inner(&state.site_service, &state.account_repo, &headers, &handle).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn actor_inner(
    site_service: &SiteService,
    account_repo: &AccountRepository,
    headers: &HeaderMap,
    handle: &str,
) -> Result<Response, AppError> {
    let host = super::request_host(headers)?;
    let site = site_service.require_enabled(&host).await?;
    let account = account_repo.get_by_site(&site.id).await?;

    if account.username != handle {
        return Err(AppError::AccountNotFound(handle.to_string()));
    }

    let ctx = ApContext::new(&site.host);
    let document = json!({
        "@context": activitystreams_context(),
        "id": account.ap_id,
        "type": "Person",
        "preferredUsername": account.username,
        "name": account.name,
        "summary": account.bio,
        "url": account.url,
        "icon": account.avatar_url.as_ref().map(|u| json!({ "type": "Image", "url": u })),
        "image": account
            .banner_image_url
            .as_ref()
            .map(|u| json!({ "type": "Image", "url": u })),
        "inbox": account.ap_inbox_url,
        "outbox": account.ap_outbox_url,
        "followers": account.ap_followers_url,
        "following": account.ap_following_url,
        "liked": account.ap_liked_url,
        "publicKey": {
            "id": ctx.key_id(&account.username),
            "owner": account.ap_id,
            "publicKeyPem": account.ap_public_key,
        },
        "manuallyApprovesFollowers": false,
        "discoverable": true,
    });

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/activity+json")],
        Json(document),
    )
        .into_response())
}
