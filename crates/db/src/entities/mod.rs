//! Database entities.

pub mod account;
pub mod block;
pub mod delivery_backoff;
pub mod domain_block;
pub mod feed;
pub mod follow;
pub mod ghost_ap_post_mapping;
pub mod key_value;
pub mod mention;
pub mod notification;
pub mod post;
pub mod post_like;
pub mod repost;
pub mod site;
pub mod user;

pub use account::Entity as Account;
pub use block::Entity as Block;
pub use delivery_backoff::Entity as DeliveryBackoff;
pub use domain_block::Entity as DomainBlock;
pub use feed::Entity as Feed;
pub use follow::Entity as Follow;
pub use ghost_ap_post_mapping::Entity as GhostApPostMapping;
pub use key_value::Entity as KeyValue;
pub use mention::Entity as Mention;
pub use notification::Entity as Notification;
pub use post::Entity as Post;
pub use post_like::Entity as PostLike;
pub use repost::Entity as Repost;
pub use site::Entity as Site;
pub use user::Entity as User;
