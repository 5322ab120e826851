//! Announce activity.

use activitypub_federation::kinds::activity::AnnounceType;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{one_or_many, ObjectRef};

/// `ActivityPub` Announce activity (repost).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AnnounceActivity {
    #[serde(rename = "type")]
    pub kind: AnnounceType,
    pub id: Url,
    pub actor: Url,
    pub object: ObjectRef,
    #[serde(default, deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub cc: Vec<String>,
}
