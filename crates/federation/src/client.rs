//! Document loader: fetches remote `ActivityStreams` documents with a
//! KV-store cache, and resolves handles through WebFinger.

use async_trait::async_trait;
use fedipress_common::{AppError, AppResult};
use fedipress_core::services::{ActorLookup, ResolvedActor};
use fedipress_db::repositories::KvRepository;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// HTTP + cache layer for remote `ActivityStreams` objects.
#[derive(Clone)]
pub struct DocumentLoader {
    http: Client,
    kv: KvRepository,
    user_agent: String,
}

impl DocumentLoader {
    /// Create a new document loader.
    ///
    /// # Panics
    /// Panics if the HTTP client fails to build.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(kv: KvRepository, user_agent: String, timeout: Duration) -> Self {
        Self {
            http: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            kv,
            user_agent,
        }
    }

    /// Fetch a document by URL, consulting the KV cache first.
    pub async fn fetch_document(&self, url: &str) -> AppResult<Value> {
        if let Some(cached) = self.kv.get(url).await? {
            debug!(url = %url, "Document cache hit");
            return Ok(cached);
        }
        let document = self.fetch_fresh(url).await?;
        if let Err(e) = self.kv.set(url, document.clone()).await {
            warn!(url = %url, error = %e, "Failed to cache document");
        }
        Ok(document)
    }

    /// Fetch a document bypassing the cache.
    pub async fn fetch_fresh(&self, url: &str) -> AppResult<Value> {
        debug!(url = %url, "Fetching remote document");
        let response = self
            .http
            .get(url)
            .header(
                "Accept",
                "application/activity+json, application/ld+json",
            )
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("fetch {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "fetch {url}: {}",
                response.status()
            )));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Upstream(format!("decode {url}: {e}")))
    }

    /// Fetch an actor document, requiring an inbox.
    pub async fn fetch_actor(&self, url: &str) -> AppResult<Value> {
        let document = self.fetch_document(url).await?;
        if document.get("inbox").and_then(Value::as_str).is_none() {
            return Err(AppError::Lookup(format!("{url} is not an actor document")));
        }
        Ok(document)
    }

    /// Fetch the PEM public key named by a key id, caching the actor
    /// document it came from.
    pub async fn fetch_public_key(&self, key_id: &str) -> AppResult<String> {
        let actor_url = key_id.split('#').next().unwrap_or(key_id);
        let actor = self.fetch_actor(actor_url).await?;

        actor
            .get("publicKey")
            .and_then(|pk| pk.get("publicKeyPem"))
            .and_then(Value::as_str)
            .map(std::string::ToString::to_string)
            .ok_or_else(|| AppError::Lookup(format!("{actor_url} has no public key")))
    }

    /// Resolve `acct:user@host` through WebFinger to an actor URL.
    pub async fn webfinger(&self, username: &str, host: &str) -> AppResult<String> {
        let url = format!(
            "https://{host}/.well-known/webfinger?resource=acct:{username}@{host}"
        );
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/jrd+json, application/json")
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| AppError::Lookup(format!("webfinger {username}@{host}: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Lookup(format!(
                "webfinger {username}@{host}: {}",
                response.status()
            )));
        }
        let jrd: Value = response
            .json()
            .await
            .map_err(|e| AppError::Lookup(format!("webfinger decode: {e}")))?;

        jrd.get("links")
            .and_then(Value::as_array)
            .and_then(|links| {
                links.iter().find(|link| {
                    link.get("rel").and_then(Value::as_str) == Some("self")
                })
            })
            .and_then(|link| link.get("href").and_then(Value::as_str))
            .map(std::string::ToString::to_string)
            .ok_or_else(|| {
                AppError::Lookup(format!("webfinger {username}@{host}: no self link"))
            })
    }
}

/// Extract the persisted fields from an actor document.
pub fn parse_actor_document(document: &Value) -> AppResult<ResolvedActor> {
    let field = |name: &str| {
        document
            .get(name)
            .and_then(Value::as_str)
            .map(std::string::ToString::to_string)
    };

    let ap_id = field("id").ok_or_else(|| AppError::Lookup("actor has no id".to_string()))?;
    let inbox =
        field("inbox").ok_or_else(|| AppError::Lookup("actor has no inbox".to_string()))?;
    let username = field("preferredUsername").unwrap_or_else(|| {
        Url::parse(&ap_id)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut s| s.next_back())
                    .map(std::string::ToString::to_string)
            })
            .unwrap_or_else(|| ap_id.clone())
    });

    let image_url = |name: &str| {
        document.get(name).and_then(|v| {
            v.as_str().map(std::string::ToString::to_string).or_else(|| {
                v.get("url")
                    .and_then(Value::as_str)
                    .map(std::string::ToString::to_string)
            })
        })
    };

    Ok(ResolvedActor {
        ap_id,
        username,
        name: field("name"),
        bio: field("summary"),
        avatar_url: image_url("icon"),
        banner_image_url: image_url("image"),
        url: field("url"),
        inbox,
        shared_inbox: document
            .get("endpoints")
            .and_then(|e| e.get("sharedInbox"))
            .and_then(Value::as_str)
            .map(std::string::ToString::to_string),
        outbox: field("outbox"),
        followers: field("followers"),
        following: field("following"),
        liked: field("liked"),
        public_key_pem: document
            .get("publicKey")
            .and_then(|pk| pk.get("publicKeyPem"))
            .and_then(Value::as_str)
            .map(std::string::ToString::to_string),
    })
}

#[async_trait]
impl ActorLookup for DocumentLoader {
    async fn resolve(&self, query: &str) -> AppResult<ResolvedActor> {
        let actor_url = if query.starts_with("https://") || query.starts_with("http://") {
            query.to_string()
        } else {
            let handle = query.trim_start_matches('@');
            let (username, host) = handle
                .split_once('@')
                .ok_or_else(|| AppError::BadRequest(format!("not a handle: {query}")))?;
            self.webfinger(username, host).await?
        };

        let document = self.fetch_actor(&actor_url).await?;
        parse_actor_document(&document)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_actor_document() {
        let document = json!({
            "id": "https://mastodon.example/users/alice",
            "type": "Person",
            "preferredUsername": "alice",
            "name": "Alice",
            "summary": "<p>hi</p>",
            "inbox": "https://mastodon.example/users/alice/inbox",
            "outbox": "https://mastodon.example/users/alice/outbox",
            "followers": "https://mastodon.example/users/alice/followers",
            "endpoints": { "sharedInbox": "https://mastodon.example/inbox" },
            "icon": { "type": "Image", "url": "https://mastodon.example/avatar.png" },
            "publicKey": {
                "id": "https://mastodon.example/users/alice#main-key",
                "publicKeyPem": "-----BEGIN PUBLIC KEY-----\nxx\n-----END PUBLIC KEY-----\n"
            }
        });

        let actor = parse_actor_document(&document).unwrap();
        assert_eq!(actor.ap_id, "https://mastodon.example/users/alice");
        assert_eq!(actor.username, "alice");
        assert_eq!(
            actor.shared_inbox.as_deref(),
            Some("https://mastodon.example/inbox")
        );
        assert_eq!(
            actor.avatar_url.as_deref(),
            Some("https://mastodon.example/avatar.png")
        );
        assert!(actor.public_key_pem.is_some());
    }

    #[test]
    fn test_parse_actor_requires_inbox() {
        let document = json!({ "id": "https://mastodon.example/users/alice" });
        assert!(parse_actor_document(&document).is_err());
    }
}
