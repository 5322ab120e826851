//! Accept activity.

use activitypub_federation::kinds::activity::AcceptType;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ObjectRef;

/// `ActivityPub` Accept activity (acknowledges an outbound Follow).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AcceptActivity {
    #[serde(rename = "type")]
    pub kind: AcceptType,
    pub id: Url,
    pub actor: Url,
    /// The accepted activity, embedded or by id.
    pub object: ObjectRef,
}
