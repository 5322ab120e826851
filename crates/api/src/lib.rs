//! HTTP action and webhook endpoints for fedipress.

pub mod endpoints;
pub mod response;
pub mod state;

use axum::{routing::post, Router};

pub use response::PostResponse;
pub use state::ApiState;

/// Router for the tenant action and webhook surface.
///
/// Mounted under the federated path prefix by the server binary.
/// Access control for actions is applied upstream by the role-guard
/// middleware.
#[must_use]
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/actions/follow/{handle}", post(endpoints::follow_action))
        .route(
            "/actions/unfollow/{handle}",
            post(endpoints::unfollow_action),
        )
        .route("/actions/like/{encoded_url}", post(endpoints::like_action))
        .route(
            "/actions/unlike/{encoded_url}",
            post(endpoints::unlike_action),
        )
        .route(
            "/actions/repost/{encoded_url}",
            post(endpoints::repost_action),
        )
        .route(
            "/actions/derepost/{encoded_url}",
            post(endpoints::derepost_action),
        )
        .route("/actions/note", post(endpoints::note_action))
        .route(
            "/actions/reply/{encoded_url}",
            post(endpoints::reply_action),
        )
        .route(
            "/webhooks/post/published",
            post(endpoints::post_published_webhook),
        )
        .route(
            "/webhooks/post/updated",
            post(endpoints::post_updated_webhook),
        )
        .route(
            "/webhooks/post/deleted",
            post(endpoints::post_deleted_webhook),
        )
}
