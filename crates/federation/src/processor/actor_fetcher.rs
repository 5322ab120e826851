//! Find-or-create of external accounts.

use fedipress_common::{id, AppResult};
use fedipress_db::entities::account;
use fedipress_db::repositories::AccountRepository;
use tracing::info;
use url::Url;

use crate::client::{parse_actor_document, DocumentLoader};

/// Resolves an actor URL to a stored account, fetching and persisting
/// the actor document on first contact.
#[derive(Clone)]
pub struct ActorFetcher {
    account_repo: AccountRepository,
    loader: DocumentLoader,
}

impl ActorFetcher {
    /// Create a new actor fetcher.
    #[must_use]
    pub fn new(account_repo: AccountRepository, loader: DocumentLoader) -> Self {
        Self {
            account_repo,
            loader,
        }
    }

    /// Find an account by actor URL, or fetch and create it.
    pub async fn find_or_fetch(&self, actor_url: &Url) -> AppResult<account::Model> {
        if let Some(existing) = self.account_repo.find_by_ap_id(actor_url.as_str()).await? {
            return Ok(existing);
        }

        let document = self.loader.fetch_actor(actor_url.as_str()).await?;
        let resolved = parse_actor_document(&document)?;

        // A concurrent delivery may have inserted the row while we were
        // fetching; the hash column's unique index decides the winner.
        if let Some(existing) = self.account_repo.find_by_ap_id(&resolved.ap_id).await? {
            return Ok(existing);
        }

        let model =
            resolved.into_active_model(id::row_id(), id::public_uuid())?;
        let created = self.account_repo.create(model).await?;
        info!(ap_id = %created.ap_id, "Created external account");
        Ok(created)
    }
}
