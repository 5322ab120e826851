//! API state and tenant resolution.

use axum::http::HeaderMap;
use fedipress_common::{AppError, AppResult};
use fedipress_core::services::{OutboxService, SiteService};
use fedipress_db::entities::site;

/// Shared state for the action and webhook endpoints.
#[derive(Clone)]
pub struct ApiState {
    pub site_service: SiteService,
    pub outbox: OutboxService,
    /// Allowed clock skew for webhook signatures, in seconds.
    pub webhook_tolerance_secs: u64,
}

impl ApiState {
    /// Resolve the tenant for a request from its `Host` header.
    ///
    /// Disabled tenants answer 403 on every endpoint.
    pub async fn resolve_site(&self, headers: &HeaderMap) -> AppResult<site::Model> {
        let host = headers
            .get("host")
            .and_then(|v| v.to_str().ok())
            .map(|h| h.split(':').next().unwrap_or(h).to_lowercase())
            .ok_or_else(|| AppError::BadRequest("Missing Host header".to_string()))?;
        self.site_service.require_enabled(&host).await
    }
}
