//! Federation layer for fedipress.

pub mod activities;
pub mod client;
pub mod handler;
pub mod processor;
pub mod signature;

pub use activities::{
    AcceptActivity, AnnounceActivity, ApObject, CreateActivity, DeleteActivity, FollowActivity,
    InboxActivity, LikeActivity, ObjectRef, UndoActivity,
};
pub use client::{parse_actor_document, DocumentLoader};
pub use handler::{
    actor_handler, followers_handler, following_handler, inbox_collection_handler, inbox_handler,
    liked_handler, nodeinfo_2_1, outbox_handler, thread_handler, webfinger_handler,
    well_known_nodeinfo, CollectionState, InboxState, NodeInfoState, WebfingerState,
};
pub use signature::verify_inbox_request;
