//! Undo activity.

use activitypub_federation::kinds::activity::UndoType;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ObjectRef;

/// `ActivityPub` Undo activity.
///
/// The object names the activity being undone; it may arrive before
/// that activity ever did, so processors must treat undoing an absent
/// edge as success.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UndoActivity {
    #[serde(rename = "type")]
    pub kind: UndoType,
    pub id: Url,
    pub actor: Url,
    pub object: ObjectRef,
}
