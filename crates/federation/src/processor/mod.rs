//! Per-type activity processors.
//!
//! Each processor handles one inbound activity type after the
//! dispatcher has verified the signature, resolved the sender and
//! applied moderation.

pub mod actor_fetcher;
pub mod announce;
pub mod create;
pub mod delete;
pub mod follow;
pub mod like;
pub mod undo;

pub use actor_fetcher::ActorFetcher;
pub use announce::AnnounceProcessor;
pub use create::CreateProcessor;
pub use delete::DeleteProcessor;
pub use follow::FollowProcessor;
pub use like::LikeProcessor;
pub use undo::UndoProcessor;
