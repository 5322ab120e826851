//! Like activity processor.

use fedipress_common::AppResult;
use fedipress_db::entities::account;
use fedipress_db::repositories::PostRepository;
use tracing::debug;

use crate::activities::LikeActivity;

/// Processor for inbound Like activities.
#[derive(Clone)]
pub struct LikeProcessor {
    post_repo: PostRepository,
}

impl LikeProcessor {
    /// Create a new like processor.
    #[must_use]
    pub const fn new(post_repo: PostRepository) -> Self {
        Self { post_repo }
    }

    /// Record a like edge and bump the counter. Likes of objects we do
    /// not hold are acked and dropped.
    pub async fn process(&self, activity: &LikeActivity, sender: &account::Model) -> AppResult<()> {
        let Some(object_id) = activity.object.id() else {
            debug!(id = %activity.id, "Like without object id, acking");
            return Ok(());
        };
        let Some(post) = self.post_repo.find_by_ap_id(object_id.as_str()).await? else {
            debug!(object = %object_id, "Like of unknown object, acking");
            return Ok(());
        };

        let inserted = self.post_repo.add_like(&post.id, &sender.id).await?;
        debug!(post = %post.id, inserted, "Like applied");
        Ok(())
    }
}
