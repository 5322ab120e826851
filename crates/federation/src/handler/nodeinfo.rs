//! Node info handlers.

use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use fedipress_db::repositories::SiteRepository;
use serde_json::json;

/// State required for node info handlers.
#[derive(Clone)]
pub struct NodeInfoState {
    pub site_repo: SiteRepository,
    pub software_version: String,
}

/// Handle GET `/.well-known/nodeinfo`.
pub async fn well_known_nodeinfo(
    State(_state): State<NodeInfoState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let host = super::request_host(&headers).unwrap_or_else(|_| "localhost".to_string());
    Json(json!({
        "links": [{
            "rel": "http://nodeinfo.diaspora.software/ns/schema/2.1",
            "href": format!("https://{host}/nodeinfo/2.1"),
        }]
    }))
}

/// Handle GET `/nodeinfo/2.1`.
pub async fn nodeinfo_2_1(State(state): State<NodeInfoState>) -> impl IntoResponse {
    let total_users = state.site_repo.count_users().await.unwrap_or(0);
    Json(json!({
        "version": "2.1",
        "software": {
            "name": "fedipress",
            "version": state.software_version,
        },
        "protocols": ["activitypub"],
        "services": { "inbound": [], "outbound": [] },
        "openRegistrations": false,
        "usage": {
            "users": { "total": total_users },
        },
        "metadata": {},
    }))
}
