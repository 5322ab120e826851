//! Site registry service.
//!
//! Maps HTTP hosts to tenants, and creates a tenant's site row, its
//! default internal account (with a fresh RSA key pair) and the
//! users join in a single transaction on first initialisation.

use chrono::Utc;
use fedipress_common::{
    ap_id_hash, domain_hash, id, ActorKeyPair, AppError, AppResult,
};
use fedipress_db::entities::{account, site, user};
use fedipress_db::repositories::{AccountRepository, SiteRepository};
use sea_orm::{Set, TransactionTrait};
use tracing::info;

use super::context::ApContext;

/// Handle of every site's default internal actor.
pub const DEFAULT_HANDLE: &str = "index";

/// Site registry service.
#[derive(Clone)]
pub struct SiteService {
    site_repo: SiteRepository,
    account_repo: AccountRepository,
}

impl SiteService {
    /// Create a new site service.
    #[must_use]
    pub const fn new(site_repo: SiteRepository, account_repo: AccountRepository) -> Self {
        Self {
            site_repo,
            account_repo,
        }
    }

    /// Find a site by host.
    pub async fn find_by_host(&self, host: &str) -> AppResult<Option<site::Model>> {
        self.site_repo.find_by_host(host).await
    }

    /// Find a site by host, requiring it to exist and be enabled.
    pub async fn require_enabled(&self, host: &str) -> AppResult<site::Model> {
        let site = self
            .find_by_host(host)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("site {host}")))?;
        if site.disabled {
            return Err(AppError::SiteDisabled(host.to_string()));
        }
        Ok(site)
    }

    /// The default internal account of a site.
    pub async fn default_account(&self, site: &site::Model) -> AppResult<account::Model> {
        self.account_repo.get_by_site(&site.id).await
    }

    /// Get or create the tenant for a host.
    ///
    /// First initialisation creates the site, its default internal
    /// account with a fresh RSA key pair, and the users join row in
    /// one transaction, then issues the webhook secret in the site row.
    pub async fn get_or_init(
        &self,
        host: &str,
        ghost_uuid: Option<String>,
    ) -> AppResult<site::Model> {
        if let Some(existing) = self.site_repo.find_by_host(host).await? {
            return Ok(existing);
        }
        self.init(host, ghost_uuid).await
    }

    /// Initialise a new tenant for a host.
    pub async fn init(&self, host: &str, ghost_uuid: Option<String>) -> AppResult<site::Model> {
        let host = host.to_lowercase();
        let ctx = ApContext::new(&host);
        let keys = ActorKeyPair::generate()?;
        let now = Utc::now();

        let site_id = id::row_id();
        let account_id = id::row_id();
        let ap_id = ctx.actor_uri(DEFAULT_HANDLE);

        let site_model = site::ActiveModel {
            id: Set(site_id.clone()),
            host: Set(host.clone()),
            webhook_secret: Set(id::webhook_secret()),
            ghost_uuid: Set(ghost_uuid),
            disabled: Set(false),
            created_at: Set(now.into()),
        };

        let account_model = account::ActiveModel {
            id: Set(account_id.clone()),
            uuid: Set(Some(id::public_uuid())),
            username: Set(DEFAULT_HANDLE.to_string()),
            name: Set(Some(host.clone())),
            bio: Set(None),
            avatar_url: Set(None),
            banner_image_url: Set(None),
            url: Set(Some(format!("https://{host}/"))),
            ap_id: Set(ap_id.clone()),
            ap_id_hash: Set(ap_id_hash(&ap_id)),
            ap_inbox_url: Set(ctx.inbox_uri(DEFAULT_HANDLE)),
            ap_shared_inbox_url: Set(None),
            ap_outbox_url: Set(Some(ctx.outbox_uri(DEFAULT_HANDLE))),
            ap_followers_url: Set(Some(ctx.followers_uri(DEFAULT_HANDLE))),
            ap_following_url: Set(Some(ctx.following_uri(DEFAULT_HANDLE))),
            ap_liked_url: Set(Some(ctx.liked_uri(DEFAULT_HANDLE))),
            ap_public_key: Set(Some(keys.public_key_pem().to_string())),
            ap_private_key: Set(Some(keys.private_key_pem().to_string())),
            domain: Set(host.clone()),
            domain_hash: Set(domain_hash(&host)),
            created_at: Set(now.into()),
            updated_at: Set(None),
            deleted_at: Set(None),
        };

        let user_model = user::ActiveModel {
            id: Set(id::row_id()),
            site_id: Set(site_id),
            account_id: Set(account_id),
        };

        let conn = self.site_repo.connection();
        let txn = conn
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let site = SiteRepository::insert_on(&txn, site_model).await?;
        AccountRepository::insert_on(&txn, account_model).await?;
        SiteRepository::insert_user_on(&txn, user_model).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(host = %site.host, site_id = %site.id, "Initialised site");
        Ok(site)
    }
}
