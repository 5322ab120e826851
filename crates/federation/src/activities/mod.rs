//! Typed inbound activities.
//!
//! Incoming payloads are parsed into one tagged variant per activity
//! type; the inbox dispatcher's match on this enum is the single
//! authoritative type mapping.

pub mod accept;
pub mod announce;
pub mod create;
pub mod delete;
pub mod follow;
pub mod like;
pub mod undo;

pub use accept::AcceptActivity;
pub use announce::AnnounceActivity;
pub use create::{ApObject, CreateActivity};
pub use delete::DeleteActivity;
pub use follow::FollowActivity;
pub use like::LikeActivity;
pub use undo::UndoActivity;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

/// A reference to an object: either a bare id or an embedded object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    /// Bare canonical id.
    Id(Url),
    /// Embedded object (id plus whatever else the sender included).
    Embedded(Value),
}

impl ObjectRef {
    /// The canonical id of the referenced object, when present.
    #[must_use]
    pub fn id(&self) -> Option<Url> {
        match self {
            Self::Id(url) => Some(url.clone()),
            Self::Embedded(value) => value
                .get("id")
                .and_then(Value::as_str)
                .and_then(|s| Url::parse(s).ok()),
        }
    }

    /// The embedded object's `type`, when embedded.
    #[must_use]
    pub fn object_type(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Embedded(value) => value.get("type").and_then(Value::as_str),
        }
    }

    /// The embedded value, when embedded.
    #[must_use]
    pub const fn embedded(&self) -> Option<&Value> {
        match self {
            Self::Id(_) => None,
            Self::Embedded(value) => Some(value),
        }
    }
}

/// Deserialize an `ActivityStreams` addressing field that may be a
/// single string or an array.
pub fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

/// Wrapper for incoming activities that can be any supported type.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum InboxActivity {
    Create(CreateActivity),
    Follow(FollowActivity),
    Accept(AcceptActivity),
    Undo(UndoActivity),
    Like(LikeActivity),
    Announce(AnnounceActivity),
    Delete(DeleteActivity),
    Unknown(Value),
}

impl InboxActivity {
    /// The activity type as a string.
    #[must_use]
    pub const fn activity_type(&self) -> &str {
        match self {
            Self::Create(_) => "Create",
            Self::Follow(_) => "Follow",
            Self::Accept(_) => "Accept",
            Self::Undo(_) => "Undo",
            Self::Like(_) => "Like",
            Self::Announce(_) => "Announce",
            Self::Delete(_) => "Delete",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// The canonical activity id.
    #[must_use]
    pub fn id(&self) -> Option<&Url> {
        match self {
            Self::Create(a) => Some(&a.id),
            Self::Follow(a) => Some(&a.id),
            Self::Accept(a) => Some(&a.id),
            Self::Undo(a) => Some(&a.id),
            Self::Like(a) => Some(&a.id),
            Self::Announce(a) => Some(&a.id),
            Self::Delete(a) => Some(&a.id),
            Self::Unknown(_) => None,
        }
    }

    /// The sending actor.
    #[must_use]
    pub const fn actor(&self) -> Option<&Url> {
        match self {
            Self::Create(a) => Some(&a.actor),
            Self::Follow(a) => Some(&a.actor),
            Self::Accept(a) => Some(&a.actor),
            Self::Undo(a) => Some(&a.actor),
            Self::Like(a) => Some(&a.actor),
            Self::Announce(a) => Some(&a.actor),
            Self::Delete(a) => Some(&a.actor),
            Self::Unknown(_) => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_follow() {
        let raw = r#"{
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": "https://mastodon.example/activities/1",
            "type": "Follow",
            "actor": "https://mastodon.example/users/alice",
            "object": "https://blog.example/.ghost/activitypub/users/index"
        }"#;
        let activity: InboxActivity = serde_json::from_str(raw).unwrap();
        assert_eq!(activity.activity_type(), "Follow");
        assert_eq!(
            activity.actor().unwrap().as_str(),
            "https://mastodon.example/users/alice"
        );
    }

    #[test]
    fn test_parse_create_note() {
        let raw = r#"{
            "id": "https://mastodon.example/activities/2",
            "type": "Create",
            "actor": "https://mastodon.example/users/alice",
            "to": "https://www.w3.org/ns/activitystreams#Public",
            "object": {
                "id": "https://mastodon.example/notes/9",
                "type": "Note",
                "attributedTo": "https://mastodon.example/users/alice",
                "content": "<p>hello blog</p>",
                "to": ["https://www.w3.org/ns/activitystreams#Public"]
            }
        }"#;
        let activity: InboxActivity = serde_json::from_str(raw).unwrap();
        let InboxActivity::Create(create) = activity else {
            panic!("expected Create");
        };
        // Single-string `to` is normalised to a vec.
        assert_eq!(create.to, vec![create::PUBLIC.to_string()]);
        assert_eq!(create.object.kind, "Note");
    }

    #[test]
    fn test_unknown_activity_type_parses_as_unknown() {
        let raw = r#"{"id": "x", "type": "Arrive", "actor": "https://a.example/u/1"}"#;
        let activity: InboxActivity = serde_json::from_str(raw).unwrap();
        assert_eq!(activity.activity_type(), "Unknown");
    }

    #[test]
    fn test_object_ref_accessors() {
        let bare: ObjectRef =
            serde_json::from_str(r#""https://mastodon.example/notes/9""#).unwrap();
        assert_eq!(bare.id().unwrap().as_str(), "https://mastodon.example/notes/9");
        assert!(bare.object_type().is_none());

        let embedded: ObjectRef = serde_json::from_str(
            r#"{"id": "https://mastodon.example/activities/1", "type": "Follow"}"#,
        )
        .unwrap();
        assert_eq!(embedded.object_type(), Some("Follow"));
        assert!(embedded.id().is_some());
    }
}
