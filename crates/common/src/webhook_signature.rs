//! Webhook signature verification.
//!
//! Blog publish events arrive with an `X-Ghost-Signature` header of the
//! form `sha256=<hex>, t=<unix-ms>`. The HMAC-SHA256 is computed over
//! `body || t` with the tenant's webhook secret.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Parsed `X-Ghost-Signature` header.
#[derive(Debug, Clone)]
pub struct WebhookSignature {
    /// Hex-encoded HMAC-SHA256.
    pub mac_hex: String,
    /// Millisecond timestamp the sender signed.
    pub timestamp_ms: i64,
}

impl WebhookSignature {
    /// Parse a signature header value.
    ///
    /// Format: `sha256=<hex>, t=<unix-ms>`
    pub fn parse(header: &str) -> AppResult<Self> {
        let mut mac_hex = None;
        let mut timestamp_ms = None;

        for part in header.split(',') {
            let part = part.trim();
            if let Some(hex) = part.strip_prefix("sha256=") {
                mac_hex = Some(hex.to_string());
            } else if let Some(ts) = part.strip_prefix("t=") {
                timestamp_ms = ts.parse::<i64>().ok();
            }
        }

        match (mac_hex, timestamp_ms) {
            (Some(mac_hex), Some(timestamp_ms)) => Ok(Self {
                mac_hex,
                timestamp_ms,
            }),
            _ => Err(AppError::SignatureInvalid),
        }
    }
}

/// Verify a webhook signature.
///
/// The timestamp must lie within `tolerance_secs` of the server clock,
/// and the HMAC must match under a constant-time comparison. Both
/// failures map to the same error so callers cannot distinguish them.
pub fn verify_webhook_signature(
    header: &str,
    secret: &str,
    body: &[u8],
    tolerance_secs: u64,
) -> AppResult<()> {
    let signature = WebhookSignature::parse(header)?;

    let now_ms = Utc::now().timestamp_millis();
    let skew_ms = (now_ms - signature.timestamp_ms).unsigned_abs();
    if skew_ms > tolerance_secs.saturating_mul(1000) {
        return Err(AppError::SignatureInvalid);
    }

    let expected = compute_mac(secret, body, signature.timestamp_ms);
    let provided = hex::decode(&signature.mac_hex).map_err(|_| AppError::SignatureInvalid)?;

    if expected.ct_eq(provided.as_slice()).into() {
        Ok(())
    } else {
        Err(AppError::SignatureInvalid)
    }
}

/// Compute the HMAC-SHA256 over `body || t`.
#[must_use]
pub fn compute_mac(secret: &str, body: &[u8], timestamp_ms: i64) -> Vec<u8> {
    #[allow(clippy::expect_used)] // HMAC accepts keys of any size
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    mac.update(timestamp_ms.to_string().as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Build a signature header value for a payload (used by tests and tools).
#[must_use]
pub fn sign_webhook_payload(secret: &str, body: &[u8], timestamp_ms: i64) -> String {
    let mac = compute_mac(secret, body, timestamp_ms);
    format!("sha256={}, t={}", hex::encode(mac), timestamp_ms)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_parse_signature_header() {
        let sig = WebhookSignature::parse("sha256=deadbeef, t=1750000000000").unwrap();
        assert_eq!(sig.mac_hex, "deadbeef");
        assert_eq!(sig.timestamp_ms, 1_750_000_000_000);
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        assert!(WebhookSignature::parse("sha256=deadbeef").is_err());
        assert!(WebhookSignature::parse("t=123").is_err());
        assert!(WebhookSignature::parse("").is_err());
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"post":{"current":{"uuid":"u1"}}}"#;
        let now = Utc::now().timestamp_millis();
        let header = sign_webhook_payload(SECRET, body, now);

        assert!(verify_webhook_signature(&header, SECRET, body, 300).is_ok());
    }

    #[test]
    fn test_flipped_body_bit_rejected() {
        let body = br#"{"post":{"current":{"uuid":"u1"}}}"#;
        let now = Utc::now().timestamp_millis();
        let header = sign_webhook_payload(SECRET, body, now);

        let mut tampered = body.to_vec();
        tampered[0] ^= 0x01;

        assert!(verify_webhook_signature(&header, SECRET, &tampered, 300).is_err());
    }

    #[test]
    fn test_flipped_timestamp_rejected() {
        let body = b"{}";
        let now = Utc::now().timestamp_millis();
        let header = sign_webhook_payload(SECRET, body, now);

        // Same MAC, different claimed timestamp.
        let forged = header.replace(&format!("t={now}"), &format!("t={}", now + 1));

        assert!(verify_webhook_signature(&forged, SECRET, body, 300).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = b"{}";
        let stale = Utc::now().timestamp_millis() - 10 * 60 * 1000;
        let header = sign_webhook_payload(SECRET, body, stale);

        assert!(verify_webhook_signature(&header, SECRET, body, 300).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = b"{}";
        let now = Utc::now().timestamp_millis();
        let header = sign_webhook_payload(SECRET, body, now);

        assert!(verify_webhook_signature(&header, "other-secret", body, 300).is_err());
    }
}
