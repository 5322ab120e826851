//! Blog webhook payload schema.
//!
//! The post-published webhook carries `{ post: { current: …, previous: … } }`
//! where `current` is the post as the blog sees it after the event.
//! Signature verification happens before this schema is parsed.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Top-level webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookBody {
    /// The post envelope.
    pub post: WebhookPostEnvelope,
}

/// The `post` envelope of a webhook body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPostEnvelope {
    /// Post state after the event. Empty object on deletions.
    #[serde(default)]
    pub current: Option<GhostPost>,
    /// Post state before the event, when the blog sends one.
    #[serde(default)]
    pub previous: Option<GhostPost>,
}

/// Content visibility as the blog models it. Anything but `public`
/// stays off the Fediverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GhostVisibility {
    Public,
    Members,
    Paid,
    Tiers,
}

/// One author entry from the blog payload.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct GhostAuthor {
    /// Author display name.
    pub name: String,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

/// A blog post as carried by the webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct GhostPost {
    /// Stable blog-side identifier; the idempotency key.
    pub uuid: String,
    /// Post title.
    #[serde(default)]
    pub title: Option<String>,
    /// Rendered HTML content.
    #[serde(default)]
    pub html: Option<String>,
    /// Generated excerpt.
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Author-written excerpt; preferred over the generated one.
    #[serde(default)]
    pub custom_excerpt: Option<String>,
    /// Feature image URL.
    #[serde(default)]
    pub feature_image: Option<String>,
    /// Publication timestamp.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Canonical public URL on the blog.
    #[serde(default)]
    pub url: Option<String>,
    /// Content visibility.
    pub visibility: GhostVisibility,
    /// Author list.
    #[serde(default)]
    pub authors: Option<Vec<GhostAuthor>>,
}

impl GhostPost {
    /// The excerpt to federate: the author-written one wins.
    #[must_use]
    pub fn effective_excerpt(&self) -> Option<String> {
        self.custom_excerpt
            .clone()
            .filter(|e| !e.is_empty())
            .or_else(|| self.excerpt.clone().filter(|e| !e.is_empty()))
    }

    /// Whether the payload carries federatable content.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.html.as_deref().is_some_and(|h| !h.trim().is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "post": {
            "current": {
                "uuid": "11111111-1111-1111-1111-111111111111",
                "title": "Hello World",
                "html": "<p>first post</p>",
                "excerpt": "first post",
                "custom_excerpt": null,
                "feature_image": null,
                "published_at": "2026-07-01T10:00:00.000Z",
                "url": "https://blog.example/hello-world/",
                "visibility": "public",
                "authors": [{"name": "Pat Author"}]
            }
        }
    }"#;

    #[test]
    fn test_parse_published_webhook() {
        let body: WebhookBody = serde_json::from_str(BODY).unwrap();
        let post = body.post.current.unwrap();

        assert_eq!(post.uuid, "11111111-1111-1111-1111-111111111111");
        assert_eq!(post.visibility, GhostVisibility::Public);
        assert!(post.has_content());
        assert_eq!(post.effective_excerpt().as_deref(), Some("first post"));
        assert_eq!(post.authors.unwrap()[0].name, "Pat Author");
    }

    #[test]
    fn test_custom_excerpt_wins() {
        let mut post: GhostPost = serde_json::from_str(
            r#"{"uuid":"u","visibility":"public","excerpt":"gen","custom_excerpt":"mine"}"#,
        )
        .unwrap();
        assert_eq!(post.effective_excerpt().as_deref(), Some("mine"));
        post.custom_excerpt = Some(String::new());
        assert_eq!(post.effective_excerpt().as_deref(), Some("gen"));
    }

    #[test]
    fn test_members_only_is_not_public() {
        let post: GhostPost =
            serde_json::from_str(r#"{"uuid":"u","visibility":"members","html":"<p>x</p>"}"#)
                .unwrap();
        assert_ne!(post.visibility, GhostVisibility::Public);
    }
}
