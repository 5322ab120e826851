//! Database repositories.

pub mod account;
pub mod delivery_backoff;
pub mod feed;
pub mod ghost_mapping;
pub mod kv;
pub mod notification;
pub mod post;
pub mod site;

pub use account::AccountRepository;
pub use delivery_backoff::DeliveryBackoffRepository;
pub use feed::FeedRepository;
pub use ghost_mapping::GhostMappingRepository;
pub use kv::KvRepository;
pub use notification::NotificationRepository;
pub use post::PostRepository;
pub use site::SiteRepository;
