//! Federation HTTP handlers.

pub mod actor;
pub mod collections;
pub mod inbox;
pub mod nodeinfo;
pub mod webfinger;

pub use actor::actor_handler;
pub use collections::{
    followers_handler, following_handler, inbox_collection_handler, liked_handler, outbox_handler,
    thread_handler, CollectionState,
};
pub use inbox::{inbox_handler, InboxState};
pub use nodeinfo::{nodeinfo_2_1, well_known_nodeinfo, NodeInfoState};
pub use webfinger::{webfinger_handler, WebfingerState};

use axum::http::HeaderMap;
use fedipress_common::{AppError, AppResult};

/// The tenant host of a request, from the `Host` header.
pub(crate) fn request_host(headers: &HeaderMap) -> AppResult<String> {
    headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .map(|h| h.split(':').next().unwrap_or(h).to_lowercase())
        .ok_or_else(|| AppError::BadRequest("Missing Host header".to_string()))
}
