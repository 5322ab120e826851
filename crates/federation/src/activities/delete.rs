//! Delete activity.

use activitypub_federation::kinds::activity::DeleteType;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ObjectRef;

/// `ActivityPub` Delete activity.
///
/// The object is either an actor (account soft-delete) or a post.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DeleteActivity {
    #[serde(rename = "type")]
    pub kind: DeleteType,
    pub id: Url,
    pub actor: Url,
    pub object: ObjectRef,
}
