//! Domain events emitted by the aggregates.

use async_trait::async_trait;

use crate::entities::post::{PostAudience, PostType};

/// Events pulled from an aggregate and applied transactionally by the
/// repositories, then published to the in-process bus after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// An account started following another.
    AccountFollowed {
        follower_id: String,
        following_id: String,
    },
    /// An account stopped following another.
    AccountUnfollowed {
        follower_id: String,
        following_id: String,
    },
    /// An account blocked another; severs follows in both directions.
    AccountBlocked {
        blocker_id: String,
        blocked_id: String,
    },
    /// An account unblocked another.
    AccountUnblocked {
        blocker_id: String,
        blocked_id: String,
    },
    /// An account blocked a whole domain; severs matching follows.
    DomainBlocked { blocker_id: String, domain: String },
    /// An account unblocked a domain.
    DomainUnblocked { blocker_id: String, domain: String },

    /// A post was created.
    PostCreated {
        post_id: String,
        author_id: String,
        post_type: PostType,
        audience: PostAudience,
        in_reply_to: Option<String>,
        mentioned_account_ids: Vec<String>,
    },
    /// A post was soft-deleted.
    PostDeleted { post_id: String, author_id: String },
    /// A post was liked.
    PostLiked {
        post_id: String,
        author_id: String,
        account_id: String,
    },
    /// A like was withdrawn.
    PostDisliked {
        post_id: String,
        author_id: String,
        account_id: String,
    },
    /// A post was reposted.
    PostReposted {
        post_id: String,
        author_id: String,
        account_id: String,
    },
    /// A repost was withdrawn.
    PostDereposted {
        post_id: String,
        author_id: String,
        account_id: String,
    },
}

/// Post-commit event consumer.
///
/// Implemented by the in-process event bus; repositories publish
/// best-effort, so the sink must never fail the caller.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one committed event.
    async fn publish(&self, event: DomainEvent);
}

/// Sink that discards every event (tests, one-off tools).
#[derive(Clone, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn publish(&self, _event: DomainEvent) {}
}
