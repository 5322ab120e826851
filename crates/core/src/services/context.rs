//! Addressing context for a tenant's federated surface.
//!
//! Every URI a tenant exposes lives under `/.ghost/activitypub` on the
//! tenant's host, and the ids of internally-authored objects are
//! deterministic functions of their uuid.

use serde_json::Value;

/// The `ActivityStreams` public collection.
pub const PUBLIC_COLLECTION: &str = "https://www.w3.org/ns/activitystreams#Public";

/// The JSON-LD context federated payloads carry.
#[must_use]
pub fn activitystreams_context() -> Value {
    serde_json::json!([
        "https://www.w3.org/ns/activitystreams",
        "https://w3id.org/security/v1",
    ])
}

/// URI builder for one tenant.
#[derive(Debug, Clone)]
pub struct ApContext {
    host: String,
}

impl ApContext {
    /// Path prefix of the federated surface.
    pub const PREFIX: &'static str = "/.ghost/activitypub";

    /// Create a context for a host.
    #[must_use]
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_lowercase(),
        }
    }

    /// The tenant host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    fn base(&self) -> String {
        format!("https://{}{}", self.host, Self::PREFIX)
    }

    /// Canonical actor URL for a handle.
    #[must_use]
    pub fn actor_uri(&self, handle: &str) -> String {
        format!("{}/users/{handle}", self.base())
    }

    /// Signing key id for a handle.
    #[must_use]
    pub fn key_id(&self, handle: &str) -> String {
        format!("{}#main-key", self.actor_uri(handle))
    }

    /// Inbox URL for a handle.
    #[must_use]
    pub fn inbox_uri(&self, handle: &str) -> String {
        format!("{}/inbox/{handle}", self.base())
    }

    /// Outbox collection URL for a handle.
    #[must_use]
    pub fn outbox_uri(&self, handle: &str) -> String {
        format!("{}/outbox/{handle}", self.base())
    }

    /// Followers collection URL for a handle.
    #[must_use]
    pub fn followers_uri(&self, handle: &str) -> String {
        format!("{}/followers/{handle}", self.base())
    }

    /// Following collection URL for a handle.
    #[must_use]
    pub fn following_uri(&self, handle: &str) -> String {
        format!("{}/following/{handle}", self.base())
    }

    /// Liked collection URL for a handle.
    #[must_use]
    pub fn liked_uri(&self, handle: &str) -> String {
        format!("{}/liked/{handle}", self.base())
    }

    /// Deterministic object URL for an internally-authored article.
    #[must_use]
    pub fn article_uri(&self, uuid: &str) -> String {
        format!("{}/article/{uuid}", self.base())
    }

    /// Deterministic object URL for an internally-authored note.
    #[must_use]
    pub fn note_uri(&self, uuid: &str) -> String {
        format!("{}/note/{uuid}", self.base())
    }

    /// Deterministic id for an activity of the given kind.
    #[must_use]
    pub fn activity_uri(&self, kind: &str, uuid: &str) -> String {
        format!("{}/{kind}/{uuid}", self.base())
    }

    /// KV key of the inbox membership list for a handle.
    #[must_use]
    pub fn inbox_list_key(&self, handle: &str) -> String {
        self.inbox_uri(handle)
    }

    /// KV key of the outbox membership list for a handle.
    #[must_use]
    pub fn outbox_list_key(&self, handle: &str) -> String {
        self.outbox_uri(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uris_are_deterministic() {
        let ctx = ApContext::new("Blog.Example");
        assert_eq!(
            ctx.actor_uri("index"),
            "https://blog.example/.ghost/activitypub/users/index"
        );
        assert_eq!(
            ctx.article_uri("11111111-1111-1111-1111-111111111111"),
            "https://blog.example/.ghost/activitypub/article/11111111-1111-1111-1111-111111111111"
        );
        assert_eq!(
            ctx.activity_uri("follow", "abc"),
            "https://blog.example/.ghost/activitypub/follow/abc"
        );
        assert_eq!(
            ctx.key_id("index"),
            "https://blog.example/.ghost/activitypub/users/index#main-key"
        );
    }
}
