//! Announce activity processor.

use fedipress_common::{id, AppResult};
use fedipress_db::domain::PostAggregate;
use fedipress_db::entities::account;
use fedipress_db::entities::post::PostAudience;
use fedipress_db::repositories::PostRepository;
use serde_json::Value;
use tracing::{debug, info};

use crate::activities::AnnounceActivity;
use crate::client::DocumentLoader;
use crate::processor::ActorFetcher;

/// Processor for inbound Announce activities.
///
/// Ensures the announced object exists as a post (fetching it through
/// the document loader when unknown), then records the repost edge for
/// the sender.
#[derive(Clone)]
pub struct AnnounceProcessor {
    post_repo: PostRepository,
    actor_fetcher: ActorFetcher,
    loader: DocumentLoader,
}

impl AnnounceProcessor {
    /// Create a new announce processor.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        actor_fetcher: ActorFetcher,
        loader: DocumentLoader,
    ) -> Self {
        Self {
            post_repo,
            actor_fetcher,
            loader,
        }
    }

    /// Process an inbound Announce from `sender`.
    pub async fn process(
        &self,
        activity: &AnnounceActivity,
        sender: &account::Model,
    ) -> AppResult<()> {
        let Some(object_id) = activity.object.id() else {
            debug!(id = %activity.id, "Announce without object id, acking");
            return Ok(());
        };

        let post = match self.post_repo.find_by_ap_id(object_id.as_str()).await? {
            Some(existing) => existing,
            None => match self.fetch_announced_post(object_id.as_str()).await? {
                Some(created) => created,
                None => {
                    debug!(object = %object_id, "Announced object unusable, acking");
                    return Ok(());
                }
            },
        };

        let inserted = self.post_repo.add_repost(&post.id, &sender.id).await?;
        info!(post = %post.id, inserted, "Announce applied");
        Ok(())
    }

    /// Fetch the announced object and persist it as an external post.
    async fn fetch_announced_post(
        &self,
        object_id: &str,
    ) -> AppResult<Option<fedipress_db::entities::post::Model>> {
        let Ok(document) = self.loader.fetch_document(object_id).await else {
            return Ok(None);
        };

        let kind = document.get("type").and_then(Value::as_str).unwrap_or("");
        if kind != "Note" && kind != "Article" {
            return Ok(None);
        }
        let Some(attributed_to) = document
            .get("attributedTo")
            .and_then(Value::as_str)
            .and_then(|s| url::Url::parse(s).ok())
        else {
            return Ok(None);
        };

        let author = self.actor_fetcher.find_or_fetch(&attributed_to).await?;
        let content = document
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let published = document
            .get("published")
            .and_then(Value::as_str)
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map_or_else(chrono::Utc::now, |dt| dt.to_utc());

        let mut aggregate = if kind == "Article" {
            PostAggregate::new_article(
                &author.id,
                &id::public_uuid(),
                object_id,
                document
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                Some(content),
                None,
                document
                    .get("url")
                    .and_then(Value::as_str)
                    .map(std::string::ToString::to_string),
                None,
                published,
                None,
            )
        } else {
            PostAggregate::new_note(
                &author.id,
                &id::public_uuid(),
                object_id,
                content,
                PostAudience::Public,
                published,
            )
        };
        self.post_repo.save(&mut aggregate).await?;
        Ok(Some(aggregate.model))
    }
}
