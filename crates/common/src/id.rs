//! Identifier minting and case-folded hashing.
//!
//! Row ids are lowercase ULIDs: id-descending index scans double as
//! reverse-chronological ordering, which the collection dispatchers
//! rely on for their tie-breaks.

use rand::RngCore;
use sha2::{Digest, Sha256};
use ulid::Ulid;
use uuid::Uuid;

/// Mint a row id.
#[must_use]
pub fn row_id() -> String {
    Ulid::new().to_string().to_lowercase()
}

/// Mint a stable public identifier (exposed in DTOs and object urls).
#[must_use]
pub fn public_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Mint a tenant webhook secret: 32 random bytes, hex-encoded.
#[must_use]
pub fn webhook_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash an `ActivityPub` id for case-insensitive unique lookups.
///
/// The hex SHA-256 of the lowercased URL; every `ap_id` comparison in
/// the database goes through this value.
#[must_use]
pub fn ap_id_hash(ap_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ap_id.to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a domain name for domain-block matching.
#[must_use]
pub fn domain_hash(domain: &str) -> String {
    ap_id_hash(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_ids_are_sortable_ulids() {
        let ids: Vec<String> = (0..8).map(|_| row_id()).collect();

        for id in &ids {
            assert_eq!(id.len(), 26);
            assert_eq!(*id, id.to_lowercase());
        }
        // Distinct even within one millisecond.
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn test_public_uuid_shape() {
        let id = public_uuid();
        assert_eq!(id.len(), 36);
        assert_eq!(id.matches('-').count(), 4);
    }

    #[test]
    fn test_webhook_secret_is_32_byte_hex() {
        let secret = webhook_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(secret, webhook_secret());
    }

    #[test]
    fn test_ap_id_hash_case_folds() {
        let a = ap_id_hash("https://Blog.Example/Users/Index");
        let b = ap_id_hash("https://blog.example/users/index");
        let c = ap_id_hash("https://blog.example/users/other");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
