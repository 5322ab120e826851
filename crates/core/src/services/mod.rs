//! Core services.

pub mod context;
pub mod delivery;
pub mod feed;
pub mod lookup;
pub mod notification;
pub mod outbox;
pub mod site;
pub mod webhook;

pub use context::ApContext;
pub use delivery::{
    MessageKind, MessageQueue, NoOpQueue, QueueMessage, QueueService, RecordingQueue, TraceContext,
};
pub use feed::FeedProjection;
pub use lookup::{ActorLookup, LookupService, ResolvedActor};
pub use notification::NotificationProjection;
pub use outbox::{
    FollowOutcome, LikeOutcome, NoteOutcome, OutboxService, PublishOutcome, RepostOutcome,
    UnfollowOutcome,
};
pub use site::SiteService;
pub use webhook::{GhostAuthor, GhostPost, GhostVisibility, WebhookBody};
