//! Delete activity processor.

use fedipress_common::{AppError, AppResult};
use fedipress_db::domain::PostAggregate;
use fedipress_db::entities::account;
use fedipress_db::repositories::{AccountRepository, PostRepository};
use tracing::{debug, info};

use crate::activities::DeleteActivity;

/// Processor for inbound Delete activities.
///
/// Deleting an actor soft-deletes its account; deleting an object
/// soft-deletes the matching post. Only self-deletions are honoured.
#[derive(Clone)]
pub struct DeleteProcessor {
    account_repo: AccountRepository,
    post_repo: PostRepository,
}

impl DeleteProcessor {
    /// Create a new delete processor.
    #[must_use]
    pub const fn new(account_repo: AccountRepository, post_repo: PostRepository) -> Self {
        Self {
            account_repo,
            post_repo,
        }
    }

    /// Process an inbound Delete from `sender`.
    pub async fn process(
        &self,
        activity: &DeleteActivity,
        sender: &account::Model,
    ) -> AppResult<()> {
        let Some(object_id) = activity.object.id() else {
            debug!(id = %activity.id, "Delete without object id, acking");
            return Ok(());
        };

        // Actor deleting itself.
        if object_id == activity.actor {
            self.account_repo.soft_delete(&sender.id).await?;
            info!(account = %sender.ap_id, "Account soft-deleted");
            return Ok(());
        }

        // Otherwise the object should be a post we hold.
        let Some(model) = self.post_repo.find_by_ap_id(object_id.as_str()).await? else {
            debug!(object = %object_id, "Delete of unknown object, acking");
            return Ok(());
        };
        if model.deleted_at.is_some() {
            return Ok(());
        }

        let mut aggregate = PostAggregate::from_model(model);
        match aggregate.delete(&sender.id) {
            Ok(()) => {
                self.post_repo.save(&mut aggregate).await?;
                info!(object = %object_id, "Post soft-deleted");
                Ok(())
            }
            // Deletes from anyone but the author are dropped.
            Err(AppError::NotAuthor) => {
                debug!(object = %object_id, actor = %sender.ap_id, "Delete by non-author, dropping");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
