//! Inbound HTTP signature verification.
//!
//! Federated inbox POSTs must carry a draft-cavage signature covering
//! at least the canonical header set (`(request-target)`, `host`,
//! `date`, `digest`), plus a digest matching the body. Any failure
//! maps to `401` with no body.

use axum::http::HeaderMap;
use fedipress_common::{
    digest_matches, verify_signature, AppError, AppResult, HttpSignature, SIGNED_HEADER_NAMES,
};
use std::collections::HashMap;
use tracing::debug;

/// Verify the signature on an inbox request.
///
/// Returns the verified key id (the sender's key URL) so the caller
/// can cross-check it against the claimed actor.
pub fn verify_inbox_request(
    headers: &HeaderMap,
    method: &str,
    path: &str,
    body: &[u8],
    public_key_pem: &str,
) -> AppResult<String> {
    let signature = parse_signature_header(headers)?;

    for required in SIGNED_HEADER_NAMES {
        if !signature.headers.iter().any(|h| h == required) {
            debug!(missing = required, "Signature does not cover required header");
            return Err(AppError::SignatureInvalid);
        }
    }

    let digest_header = headers
        .get("digest")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::SignatureInvalid)?;
    if !digest_matches(body, digest_header) {
        debug!("Digest mismatch");
        return Err(AppError::SignatureInvalid);
    }

    let mut header_map = HashMap::new();
    for name in &signature.headers {
        if name == "(request-target)" {
            continue;
        }
        let value = headers
            .get(name.as_str())
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::SignatureInvalid)?;
        header_map.insert(name.to_lowercase(), value.to_string());
    }

    let valid = verify_signature(&signature, public_key_pem, method, path, &header_map)
        .map_err(|_| AppError::SignatureInvalid)?;
    if !valid {
        return Err(AppError::SignatureInvalid);
    }

    debug!(key_id = %signature.key_id, "Inbox signature verified");
    Ok(signature.key_id)
}

/// Parse the `Signature` header from a request.
pub fn parse_signature_header(headers: &HeaderMap) -> AppResult<HttpSignature> {
    let raw = headers
        .get("signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::SignatureInvalid)?;
    HttpSignature::parse(raw).map_err(|_| AppError::SignatureInvalid)
}

/// The key id claimed by the request, without verifying anything.
///
/// Needed before verification to fetch the sender's public key.
pub fn claimed_key_id(headers: &HeaderMap) -> AppResult<String> {
    Ok(parse_signature_header(headers)?.key_id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use fedipress_common::{ActorKeyPair, RequestSigner, SignedHeaders};
    use url::Url;

    const KEY_ID: &str = "https://mastodon.example/users/alice#main-key";

    fn inbox_url() -> Url {
        Url::parse("https://blog.example/.ghost/activitypub/inbox/index").unwrap()
    }

    fn header_map(signed: &SignedHeaders) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in signed.iter() {
            headers.insert(
                name.to_lowercase().parse::<axum::http::HeaderName>().unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        headers
    }

    fn signed_request(keys: &ActorKeyPair, body: &[u8]) -> HeaderMap {
        let signed = RequestSigner::new(keys, KEY_ID)
            .sign_post(&inbox_url(), body)
            .unwrap();
        header_map(&signed)
    }

    #[test]
    fn test_valid_request_verifies() {
        let keys = ActorKeyPair::generate().unwrap();
        let body = br#"{"type":"Follow"}"#;
        let headers = signed_request(&keys, body);

        let key_id = verify_inbox_request(
            &headers,
            "POST",
            inbox_url().path(),
            body,
            keys.public_key_pem(),
        )
        .unwrap();
        assert_eq!(key_id, KEY_ID);
    }

    #[test]
    fn test_tampered_body_rejected() {
        let keys = ActorKeyPair::generate().unwrap();
        let headers = signed_request(&keys, br#"{"type":"Follow"}"#);

        let result = verify_inbox_request(
            &headers,
            "POST",
            inbox_url().path(),
            br#"{"type":"Delete"}"#,
            keys.public_key_pem(),
        );
        assert!(matches!(result, Err(AppError::SignatureInvalid)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let signer_keys = ActorKeyPair::generate().unwrap();
        let other_keys = ActorKeyPair::generate().unwrap();
        let body = br#"{"type":"Follow"}"#;
        let headers = signed_request(&signer_keys, body);

        let result = verify_inbox_request(
            &headers,
            "POST",
            inbox_url().path(),
            body,
            other_keys.public_key_pem(),
        );
        assert!(matches!(result, Err(AppError::SignatureInvalid)));
    }

    #[test]
    fn test_missing_signature_header_rejected() {
        let headers = HeaderMap::new();
        assert!(matches!(
            claimed_key_id(&headers),
            Err(AppError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_signature_must_cover_digest() {
        let keys = ActorKeyPair::generate().unwrap();
        let body = br#"{}"#;
        let mut signed = RequestSigner::new(&keys, KEY_ID)
            .sign_post(&inbox_url(), body)
            .unwrap();

        // A sender claiming digest is outside the signed set is
        // rejected before any crypto runs.
        signed.signature = signed.signature.replace(
            r#"headers="(request-target) host date digest""#,
            r#"headers="(request-target) host date""#,
        );
        let headers = header_map(&signed);

        let result = verify_inbox_request(
            &headers,
            "POST",
            inbox_url().path(),
            body,
            keys.public_key_pem(),
        );
        assert!(matches!(result, Err(AppError::SignatureInvalid)));
    }
}
