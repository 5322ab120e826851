//! `WebFinger` handler for actor discovery.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fedipress_core::services::{ApContext, SiteService};
use fedipress_db::repositories::AccountRepository;
use serde::{Deserialize, Serialize};
use tracing::info;

/// `WebFinger` query parameters.
#[derive(Debug, Deserialize)]
pub struct WebfingerQuery {
    pub resource: String,
}

/// `WebFinger` response.
#[derive(Debug, Serialize)]
pub struct WebfingerResponse {
    pub subject: String,
    pub aliases: Vec<String>,
    pub links: Vec<WebfingerLink>,
}

/// `WebFinger` link.
#[derive(Debug, Serialize)]
pub struct WebfingerLink {
    pub rel: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// State required for the `WebFinger` handler.
#[derive(Clone)]
pub struct WebfingerState {
    pub site_service: SiteService,
    pub account_repo: AccountRepository,
}

/// Parsed `acct:` resource.
fn parse_acct(resource: &str) -> Option<(String, String)> {
    let rest = resource.strip_prefix("acct:")?;
    let (username, domain) = rest.split_once('@')?;
    Some((username.to_string(), domain.to_lowercase()))
}

/// Handle GET `/.well-known/webfinger?resource=acct:user@host`.
pub async fn webfinger_handler(
    State(state): State<WebfingerState>,
    Query(query): Query<WebfingerQuery>,
) -> impl IntoResponse {
    info!(resource = %query.resource, "WebFinger lookup");

    let Some((username, domain)) = parse_acct(&query.resource) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let site = match state.site_service.find_by_host(&domain).await {
        Ok(Some(site)) if !site.disabled => site,
        Ok(_) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return e.into_response(),
    };
    let account = match state.account_repo.get_by_site(&site.id).await {
        Ok(account) => account,
        Err(e) => return e.into_response(),
    };

    if account.username != username {
        return StatusCode::NOT_FOUND.into_response();
    }

    let ctx = ApContext::new(&site.host);
    let response = WebfingerResponse {
        subject: format!("acct:{}@{}", account.username, site.host),
        aliases: vec![account.ap_id.clone()],
        links: vec![
            WebfingerLink {
                rel: "self".to_string(),
                link_type: Some("application/activity+json".to_string()),
                href: Some(account.ap_id.clone()),
            },
            WebfingerLink {
                rel: "http://webfinger.net/rel/profile-page".to_string(),
                link_type: Some("text/html".to_string()),
                href: account.url.clone().or_else(|| {
                    Some(ctx.actor_uri(&account.username))
                }),
            },
        ],
    };

    Json(response).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_acct() {
        let (user, domain) = parse_acct("acct:index@Blog.Example").unwrap();
        assert_eq!(user, "index");
        assert_eq!(domain, "blog.example");

        assert!(parse_acct("index@blog.example").is_none());
        assert!(parse_acct("acct:no-domain").is_none());
    }
}
