//! Endpoint handlers.

pub mod actions;
pub mod webhooks;

pub use actions::{
    derepost_action, follow_action, like_action, note_action, reply_action, repost_action,
    unfollow_action, unlike_action,
};
pub use webhooks::{post_deleted_webhook, post_published_webhook, post_updated_webhook};
