//! Common utilities and shared types for fedipress.

pub mod config;
pub mod error;
pub mod http_signature;
pub mod id;
pub mod webhook_signature;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use http_signature::{
    body_digest, digest_matches, verify_signature, ActorKeyPair, HttpSignature, RequestSigner,
    SignedHeaders, SIGNED_HEADER_NAMES,
};
pub use id::{ap_id_hash, domain_hash, public_uuid, row_id, webhook_secret};
pub use webhook_signature::{verify_webhook_signature, WebhookSignature};
