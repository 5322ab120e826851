//! Local action endpoints.
//!
//! Each handler resolves the tenant from the Host header, invokes the
//! outbox service, and maps the tagged outcome onto an HTTP status.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fedipress_common::{AppError, AppResult};
use fedipress_core::services::{FollowOutcome, LikeOutcome, RepostOutcome, UnfollowOutcome};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::response::PostResponse;
use crate::state::ApiState;

/// Body for note and reply actions.
#[derive(Debug, Deserialize, Validate)]
pub struct ContentBody {
    /// HTML or plain-text content of the note.
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

fn error_body(code: &str, message: &str) -> Json<serde_json::Value> {
    Json(json!({ "error": { "code": code, "message": message } }))
}

fn decode_object_url(encoded: &str) -> AppResult<String> {
    urlencoding::decode(encoded)
        .map(|s| s.into_owned())
        .map_err(|_| AppError::BadRequest("Bad encoded URL".to_string()))
}

/// POST `/actions/follow/{handle}`.
pub async fn follow_action(
    State(state): State<ApiState>,
    Path(handle): Path<String>,
    headers: HeaderMap,
) -> Response {
    let site = match state.resolve_site(&headers).await {
        Ok(site) => site,
        Err(e) => return e.into_response(),
    };
    match state.outbox.follow(&site, &handle).await {
        Ok(FollowOutcome::Followed) => StatusCode::OK.into_response(),
        Ok(FollowOutcome::AlreadyFollowing) => (
            StatusCode::CONFLICT,
            error_body("already-following", "Already following"),
        )
            .into_response(),
        Ok(FollowOutcome::SelfFollow) => (
            StatusCode::BAD_REQUEST,
            error_body("self-follow", "Cannot follow yourself"),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST `/actions/unfollow/{handle}`.
pub async fn unfollow_action(
    State(state): State<ApiState>,
    Path(handle): Path<String>,
    headers: HeaderMap,
) -> Response {
    let site = match state.resolve_site(&headers).await {
        Ok(site) => site,
        Err(e) => return e.into_response(),
    };
    match state.outbox.unfollow(&site, &handle).await {
        Ok(UnfollowOutcome::Unfollowed) => StatusCode::OK.into_response(),
        Ok(UnfollowOutcome::NotFollowing) => (
            StatusCode::CONFLICT,
            error_body("not-following", "Not following"),
        )
            .into_response(),
        Ok(UnfollowOutcome::SelfFollow) => (
            StatusCode::BAD_REQUEST,
            error_body("self-follow", "Cannot unfollow yourself"),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST `/actions/like/{encoded-url}`.
pub async fn like_action(
    State(state): State<ApiState>,
    Path(encoded_url): Path<String>,
    headers: HeaderMap,
) -> Response {
    edge_action(&state, &headers, &encoded_url, EdgeAction::Like).await
}

/// POST `/actions/unlike/{encoded-url}`.
pub async fn unlike_action(
    State(state): State<ApiState>,
    Path(encoded_url): Path<String>,
    headers: HeaderMap,
) -> Response {
    edge_action(&state, &headers, &encoded_url, EdgeAction::Unlike).await
}

/// POST `/actions/repost/{encoded-url}`.
pub async fn repost_action(
    State(state): State<ApiState>,
    Path(encoded_url): Path<String>,
    headers: HeaderMap,
) -> Response {
    edge_action(&state, &headers, &encoded_url, EdgeAction::Repost).await
}

/// POST `/actions/derepost/{encoded-url}`.
pub async fn derepost_action(
    State(state): State<ApiState>,
    Path(encoded_url): Path<String>,
    headers: HeaderMap,
) -> Response {
    edge_action(&state, &headers, &encoded_url, EdgeAction::Derepost).await
}

#[derive(Clone, Copy)]
enum EdgeAction {
    Like,
    Unlike,
    Repost,
    Derepost,
}

async fn edge_action(
    state: &ApiState,
    headers: &HeaderMap,
    encoded_url: &str,
    action: EdgeAction,
) -> Response {
    let site = match state.resolve_site(headers).await {
        Ok(site) => site,
        Err(e) => return e.into_response(),
    };
    let object_url = match decode_object_url(encoded_url) {
        Ok(url) => url,
        Err(e) => return e.into_response(),
    };

    // Like/unlike and repost/derepost are idempotent on the counters,
    // so the already/not-yet outcomes answer 200 as well.
    let result = match action {
        EdgeAction::Like => state
            .outbox
            .like(&site, &object_url)
            .await
            .map(|o| matches!(o, LikeOutcome::Liked | LikeOutcome::AlreadyLiked)),
        EdgeAction::Unlike => state
            .outbox
            .unlike(&site, &object_url)
            .await
            .map(|o| matches!(o, LikeOutcome::Unliked | LikeOutcome::NotLiked)),
        EdgeAction::Repost => state
            .outbox
            .repost(&site, &object_url)
            .await
            .map(|o| matches!(o, RepostOutcome::Reposted | RepostOutcome::AlreadyReposted)),
        EdgeAction::Derepost => state
            .outbox
            .derepost(&site, &object_url)
            .await
            .map(|o| matches!(o, RepostOutcome::Dereposted | RepostOutcome::NotReposted)),
    };

    match result {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST `/actions/note`.
pub async fn note_action(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<ContentBody>,
) -> Response {
    let site = match state.resolve_site(&headers).await {
        Ok(site) => site,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = body.validate() {
        return AppError::from(e).into_response();
    }

    match state.outbox.create_note(&site, &body.content).await {
        Ok(outcome) => Json(PostResponse::from(outcome.post)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST `/actions/reply/{encoded-url}`.
pub async fn reply_action(
    State(state): State<ApiState>,
    Path(encoded_url): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ContentBody>,
) -> Response {
    let site = match state.resolve_site(&headers).await {
        Ok(site) => site,
        Err(e) => return e.into_response(),
    };
    if let Err(e) = body.validate() {
        return AppError::from(e).into_response();
    }
    let object_url = match decode_object_url(&encoded_url) {
        Ok(url) => url,
        Err(e) => return e.into_response(),
    };

    match state.outbox.reply(&site, &object_url, &body.content).await {
        Ok(outcome) => Json(PostResponse::from(outcome.post)).into_response(),
        Err(e) => e.into_response(),
    }
}
