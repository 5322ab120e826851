//! Collection handlers (outbox, followers, following, liked, inbox,
//! threads).
//!
//! Containers expose their first page URL in `first`; pages carry
//! `orderedItems` and `next` while more items remain. Ordering is
//! reverse chronological with id-descending tie-breaks.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fedipress_common::AppError;
use fedipress_core::services::{site::DEFAULT_HANDLE, ApContext, SiteService};
use fedipress_db::entities::account;
use fedipress_db::repositories::{AccountRepository, KvRepository, PostRepository};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

/// Items per collection page.
const PAGE_SIZE: u64 = 20;

/// Media type for `ActivityStreams` responses.
const ACTIVITY_JSON: &str = "application/activity+json";

/// State required for collection handlers.
#[derive(Clone)]
pub struct CollectionState {
    pub site_service: SiteService,
    pub account_repo: AccountRepository,
    pub post_repo: PostRepository,
    pub kv: KvRepository,
}

/// Query parameters for paginated collections.
#[derive(Debug, Deserialize)]
pub struct CollectionQuery {
    /// Page offset; absent means the container document.
    pub cursor: Option<u64>,
}

/// `ActivityPub` `OrderedCollection`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedCollection {
    #[serde(rename = "@context")]
    pub context: Value,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub total_items: u64,
    pub first: String,
}

/// `ActivityPub` `OrderedCollectionPage`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedCollectionPage {
    #[serde(rename = "@context")]
    pub context: Value,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub part_of: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    pub ordered_items: Vec<Value>,
}

fn as_context() -> Value {
    json!("https://www.w3.org/ns/activitystreams")
}

fn activity_response(value: Value) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, ACTIVITY_JSON)],
        Json(value),
    )
        .into_response()
}

fn collection_response(
    collection_uri: &str,
    cursor: Option<u64>,
    total: u64,
    items: Vec<Value>,
) -> Response {
    match cursor {
        None => {
            let collection = OrderedCollection {
                context: as_context(),
                kind: "OrderedCollection".to_string(),
                id: collection_uri.to_string(),
                total_items: total,
                first: format!("{collection_uri}?cursor=0"),
            };
            activity_response(json!(collection))
        }
        Some(cursor) => {
            let has_more = cursor + (items.len() as u64) < total;
            let page = OrderedCollectionPage {
                context: as_context(),
                kind: "OrderedCollectionPage".to_string(),
                id: format!("{collection_uri}?cursor={cursor}"),
                part_of: collection_uri.to_string(),
                next: has_more.then(|| format!("{collection_uri}?cursor={}", cursor + PAGE_SIZE)),
                ordered_items: items,
            };
            activity_response(json!(page))
        }
    }
}

async fn tenant(
    state: &CollectionState,
    headers: &HeaderMap,
) -> Result<(ApContext, account::Model), AppError> {
    let host = super::request_host(headers)?;
    let site = state.site_service.require_enabled(&host).await?;
    let account = state.account_repo.get_by_site(&site.id).await?;
    Ok((ApContext::new(&site.host), account))
}

/// GET `/outbox/{handle}`: the tenant's outbox collection, mirrored
/// from the KV activity store.
pub async fn outbox_handler(
    State(state): State<CollectionState>,
    Path(_handle): Path<String>,
    Query(query): Query<CollectionQuery>,
    headers: HeaderMap,
) -> Response {
    match outbox_inner(&state, &headers, query.cursor).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn outbox_inner(
    state: &CollectionState,
    headers: &HeaderMap,
    cursor: Option<u64>,
) -> Result<Response, AppError> {
    let (ctx, _account) = tenant(state, headers).await?;
    let uri = ctx.outbox_uri(DEFAULT_HANDLE);
    let ids = state.kv.get_list(&ctx.outbox_list_key(DEFAULT_HANDLE)).await?;
    let total = ids.len() as u64;

    let items = match cursor {
        None => Vec::new(),
        Some(cursor) => {
            let mut items = Vec::new();
            for id in page_of(&ids, cursor) {
                match state.kv.get(id).await? {
                    Some(activity) => items.push(activity),
                    None => error!(id = %id, "Outbox references missing KV entry"),
                }
            }
            items
        }
    };
    Ok(collection_response(&uri, cursor, total, items))
}

/// GET `/inbox/{handle}`: the tenant's own-inbox collection.
///
/// Access control is applied upstream by the role-guard middleware.
pub async fn inbox_collection_handler(
    State(state): State<CollectionState>,
    Path(_handle): Path<String>,
    Query(query): Query<CollectionQuery>,
    headers: HeaderMap,
) -> Response {
    match inbox_inner(&state, &headers, query.cursor).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn inbox_inner(
    state: &CollectionState,
    headers: &HeaderMap,
    cursor: Option<u64>,
) -> Result<Response, AppError> {
    let (ctx, _account) = tenant(state, headers).await?;
    let uri = ctx.inbox_uri(DEFAULT_HANDLE);
    let ids = state.kv.get_list(&ctx.inbox_list_key(DEFAULT_HANDLE)).await?;
    let total = ids.len() as u64;

    let items = match cursor {
        None => Vec::new(),
        Some(cursor) => {
            let mut items = Vec::new();
            for id in page_of(&ids, cursor) {
                if let Some(object) = state.kv.get(id).await? {
                    items.push(object);
                }
            }
            items
        }
    };
    Ok(collection_response(&uri, cursor, total, items))
}

/// GET `/followers/{handle}`: follower actors, newest follow first.
pub async fn followers_handler(
    State(state): State<CollectionState>,
    Path(_handle): Path<String>,
    Query(query): Query<CollectionQuery>,
    headers: HeaderMap,
) -> Response {
    match follow_collection(&state, &headers, query.cursor, FollowDirection::Followers).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// GET `/following/{handle}`: followed actors, newest follow first.
pub async fn following_handler(
    State(state): State<CollectionState>,
    Path(_handle): Path<String>,
    Query(query): Query<CollectionQuery>,
    headers: HeaderMap,
) -> Response {
    match follow_collection(&state, &headers, query.cursor, FollowDirection::Following).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

#[derive(Clone, Copy)]
enum FollowDirection {
    Followers,
    Following,
}

async fn follow_collection(
    state: &CollectionState,
    headers: &HeaderMap,
    cursor: Option<u64>,
    direction: FollowDirection,
) -> Result<Response, AppError> {
    let (ctx, account) = tenant(state, headers).await?;

    let (uri, total) = match direction {
        FollowDirection::Followers => (
            ctx.followers_uri(DEFAULT_HANDLE),
            state.account_repo.count_followers(&account.id).await?,
        ),
        FollowDirection::Following => (
            ctx.following_uri(DEFAULT_HANDLE),
            state.account_repo.count_following(&account.id).await?,
        ),
    };

    let items = match cursor {
        None => Vec::new(),
        Some(cursor) => {
            let accounts = match direction {
                FollowDirection::Followers => {
                    state
                        .account_repo
                        .get_followers(&account.id, PAGE_SIZE, cursor)
                        .await?
                }
                FollowDirection::Following => {
                    state
                        .account_repo
                        .get_following(&account.id, PAGE_SIZE, cursor)
                        .await?
                }
            };
            accounts.into_iter().map(|a| json!(a.ap_id)).collect()
        }
    };
    Ok(collection_response(&uri, cursor, total, items))
}

/// GET `/liked/{handle}`: liked objects, newest like first.
pub async fn liked_handler(
    State(state): State<CollectionState>,
    Path(_handle): Path<String>,
    Query(query): Query<CollectionQuery>,
    headers: HeaderMap,
) -> Response {
    match liked_inner(&state, &headers, query.cursor).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn liked_inner(
    state: &CollectionState,
    headers: &HeaderMap,
    cursor: Option<u64>,
) -> Result<Response, AppError> {
    let (ctx, account) = tenant(state, headers).await?;
    let uri = ctx.liked_uri(DEFAULT_HANDLE);
    let total = state.post_repo.count_liked_by(&account.id).await?;

    let items = match cursor {
        None => Vec::new(),
        Some(cursor) => state
            .post_repo
            .find_liked_by(&account.id, PAGE_SIZE, cursor)
            .await?
            .into_iter()
            .map(|p| json!(p.ap_id))
            .collect(),
    };
    Ok(collection_response(&uri, cursor, total, items))
}

/// GET `/thread/{encoded-url}`: every post in the thread containing
/// the given object, oldest first.
pub async fn thread_handler(
    State(state): State<CollectionState>,
    Path(encoded_url): Path<String>,
    headers: HeaderMap,
) -> Response {
    match thread_inner(&state, &headers, &encoded_url).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn thread_inner(
    state: &CollectionState,
    headers: &HeaderMap,
    encoded_url: &str,
) -> Result<Response, AppError> {
    let (_ctx, _account) = tenant(state, headers).await?;
    let object_url = urlencoding::decode(encoded_url)
        .map_err(|_| AppError::BadRequest("Bad encoded URL".to_string()))?;

    let post = state
        .post_repo
        .find_by_ap_id(&object_url)
        .await?
        .ok_or_else(|| AppError::PostNotFound(object_url.to_string()))?;
    let root_id = post.thread_root.clone().unwrap_or_else(|| post.id.clone());
    let thread = state.post_repo.find_thread(&root_id).await?;

    let mut items = Vec::new();
    for entry in thread {
        // Prefer the mirrored object; fall back to a minimal rendering.
        match state.kv.get(&entry.ap_id).await? {
            Some(object) => items.push(object),
            None => items.push(json!({
                "id": entry.ap_id,
                "type": if entry.post_type == fedipress_db::entities::post::PostType::Article {
                    "Article"
                } else {
                    "Note"
                },
                "content": entry.content,
            })),
        }
    }

    Ok(activity_response(json!({
        "@context": as_context(),
        "type": "OrderedCollection",
        "id": format!("{}?thread={}", post.ap_id, root_id),
        "totalItems": items.len(),
        "orderedItems": items,
    })))
}

fn page_of(ids: &[String], cursor: u64) -> &[String] {
    let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(ids.len());
    let end = start.saturating_add(PAGE_SIZE as usize).min(ids.len());
    &ids[start..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_of_slices_with_bounds() {
        let ids: Vec<String> = (0..25).map(|i| format!("id-{i}")).collect();
        assert_eq!(page_of(&ids, 0).len(), 20);
        assert_eq!(page_of(&ids, 20).len(), 5);
        assert_eq!(page_of(&ids, 100).len(), 0);
    }

    #[test]
    fn test_container_carries_first_page_url() {
        let response = OrderedCollection {
            context: as_context(),
            kind: "OrderedCollection".to_string(),
            id: "https://blog.example/.ghost/activitypub/outbox/index".to_string(),
            total_items: 3,
            first: "https://blog.example/.ghost/activitypub/outbox/index?cursor=0".to_string(),
        };
        let value = json!(response);
        assert_eq!(
            value["first"],
            "https://blog.example/.ghost/activitypub/outbox/index?cursor=0"
        );
        assert_eq!(value["totalItems"], 3);
    }

    #[test]
    fn test_last_page_has_no_next() {
        let items: Vec<Value> = (0..5).map(|i| json!(format!("item-{i}"))).collect();
        let response = collection_response("https://blog.example/c", Some(20), 25, items);
        // 20 + 5 == 25: no next pointer.
        assert_eq!(response.status(), StatusCode::OK);
    }
}
