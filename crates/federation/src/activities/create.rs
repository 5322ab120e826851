//! Create activity and its carried object.

use activitypub_federation::kinds::activity::CreateType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::one_or_many;

/// The `ActivityStreams` public collection id.
pub const PUBLIC: &str = "https://www.w3.org/ns/activitystreams#Public";

/// The object carried by a Create: a Note or an Article.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApObject {
    pub id: Url,
    /// `Note` or `Article`; anything else is rejected downstream.
    #[serde(rename = "type")]
    pub kind: String,
    pub attributed_to: Option<Url>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default)]
    pub published: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub in_reply_to: Option<Url>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub cc: Vec<String>,
    /// Hashtag/Mention tags.
    #[serde(default)]
    pub tag: Vec<Value>,
}

impl ApObject {
    /// Mentioned actor URLs from the object's tag list.
    #[must_use]
    pub fn mentioned_actors(&self) -> Vec<Url> {
        self.tag
            .iter()
            .filter(|t| t.get("type").and_then(Value::as_str) == Some("Mention"))
            .filter_map(|t| t.get("href").and_then(Value::as_str))
            .filter_map(|href| Url::parse(href).ok())
            .collect()
    }
}

/// `ActivityPub` Create activity.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CreateActivity {
    #[serde(rename = "type")]
    pub kind: CreateType,
    pub id: Url,
    pub actor: Url,
    pub object: ApObject,
    #[serde(default, deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub cc: Vec<String>,
}

impl CreateActivity {
    /// Whether the activity or its object addresses the public
    /// collection in `to` or `cc`.
    #[must_use]
    pub fn is_public(&self) -> bool {
        let addressed = |values: &[String]| values.iter().any(|v| v == PUBLIC);
        addressed(&self.to)
            || addressed(&self.cc)
            || addressed(&self.object.to)
            || addressed(&self.object.cc)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn create_with_to(to: &str) -> CreateActivity {
        serde_json::from_value(serde_json::json!({
            "id": "https://mastodon.example/activities/2",
            "type": "Create",
            "actor": "https://mastodon.example/users/alice",
            "to": [to],
            "object": {
                "id": "https://mastodon.example/notes/9",
                "type": "Note",
                "attributedTo": "https://mastodon.example/users/alice",
                "content": "<p>hi</p>"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_publicness() {
        assert!(create_with_to(PUBLIC).is_public());
        assert!(!create_with_to("https://mastodon.example/users/alice/followers").is_public());
    }

    #[test]
    fn test_mentioned_actors() {
        let object: ApObject = serde_json::from_value(serde_json::json!({
            "id": "https://mastodon.example/notes/9",
            "type": "Note",
            "attributedTo": "https://mastodon.example/users/alice",
            "content": "<p>@index hi</p>",
            "tag": [
                {"type": "Mention", "href": "https://blog.example/.ghost/activitypub/users/index"},
                {"type": "Hashtag", "href": "https://mastodon.example/tags/rust"}
            ]
        }))
        .unwrap();

        let mentioned = object.mentioned_actors();
        assert_eq!(mentioned.len(), 1);
        assert_eq!(
            mentioned[0].as_str(),
            "https://blog.example/.ghost/activitypub/users/index"
        );
    }
}
