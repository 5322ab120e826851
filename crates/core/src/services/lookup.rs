//! Remote actor lookup seam.
//!
//! Resolving a handle (`@user@host`) or a bare actor URL to a remote
//! actor document requires WebFinger and signed fetches; the
//! federation crate implements this trait, core services consume it.

use async_trait::async_trait;
use chrono::Utc;
use fedipress_common::{ap_id_hash, domain_hash, AppError, AppResult};
use fedipress_db::entities::account;
use sea_orm::Set;
use std::sync::Arc;
use url::Url;

/// The fields of a resolved remote actor document that the domain
/// layer persists.
#[derive(Debug, Clone, Default)]
pub struct ResolvedActor {
    /// Canonical actor URL.
    pub ap_id: String,
    /// Preferred username.
    pub username: String,
    /// Actor display name.
    pub name: Option<String>,
    /// Actor summary.
    pub bio: Option<String>,
    /// Icon URL.
    pub avatar_url: Option<String>,
    /// Header image URL.
    pub banner_image_url: Option<String>,
    /// Profile URL; falls back to `ap_id` downstream when absent.
    pub url: Option<String>,
    /// Delivery inbox.
    pub inbox: String,
    /// Shared inbox, when the instance exposes one.
    pub shared_inbox: Option<String>,
    /// Outbox collection URL.
    pub outbox: Option<String>,
    /// Followers collection URL.
    pub followers: Option<String>,
    /// Following collection URL.
    pub following: Option<String>,
    /// Liked collection URL.
    pub liked: Option<String>,
    /// PEM public key for signature verification.
    pub public_key_pem: Option<String>,
}

impl ResolvedActor {
    /// Build the external-account row for this actor.
    ///
    /// External accounts carry no private key; `url` falls back to the
    /// canonical actor URL.
    pub fn into_active_model(self, id: String, uuid: String) -> AppResult<account::ActiveModel> {
        let parsed = Url::parse(&self.ap_id)
            .map_err(|e| AppError::Lookup(format!("bad actor id: {e}")))?;
        let domain = parsed
            .host_str()
            .ok_or_else(|| AppError::Lookup("actor id has no host".to_string()))?
            .to_lowercase();

        Ok(account::ActiveModel {
            id: Set(id),
            uuid: Set(Some(uuid)),
            username: Set(self.username),
            name: Set(self.name),
            bio: Set(self.bio),
            avatar_url: Set(self.avatar_url),
            banner_image_url: Set(self.banner_image_url),
            url: Set(Some(self.url.unwrap_or_else(|| self.ap_id.clone()))),
            ap_id: Set(self.ap_id.clone()),
            ap_id_hash: Set(ap_id_hash(&self.ap_id)),
            ap_inbox_url: Set(self.inbox),
            ap_shared_inbox_url: Set(self.shared_inbox),
            ap_outbox_url: Set(self.outbox),
            ap_followers_url: Set(self.followers),
            ap_following_url: Set(self.following),
            ap_liked_url: Set(self.liked),
            ap_public_key: Set(self.public_key_pem),
            ap_private_key: Set(None),
            domain: Set(domain.clone()),
            domain_hash: Set(domain_hash(&domain)),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
            deleted_at: Set(None),
        })
    }
}

/// Trait for resolving actors by handle or URL.
#[async_trait]
pub trait ActorLookup: Send + Sync {
    /// Resolve `@user@host`, `user@host` or an `https://` actor URL.
    async fn resolve(&self, query: &str) -> AppResult<ResolvedActor>;
}

/// Shared handle to the configured lookup.
pub type LookupService = Arc<dyn ActorLookup>;
