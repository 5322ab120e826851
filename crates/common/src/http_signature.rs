//! Actor keys and HTTP signatures.
//!
//! Every internal account owns an RSA key pair, generated when its
//! site is initialised and stored as PEM on the account row. Outbound
//! inbox POSTs sign `(request-target) host date digest` with it;
//! inbound POSTs are verified against the sender's published key. The
//! canonical header order lives here, shared by both directions.
//!
//! See: <https://datatracker.ietf.org/doc/html/draft-cavage-http-signatures>

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use rsa::{
    pkcs1v15::{Signature, SigningKey, VerifyingKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding},
    sha2::Sha256,
    signature::{SignatureEncoding, Signer, Verifier},
    RsaPrivateKey, RsaPublicKey,
};
use sha2::{Digest, Sha256 as Sha256Hasher};
use std::collections::HashMap;
use url::Url;

use crate::{AppError, AppResult};

/// Headers every federated POST signs, in canonical order.
pub const SIGNED_HEADER_NAMES: [&str; 4] = ["(request-target)", "host", "date", "digest"];

/// RSA key material for one internal actor.
///
/// The private half never leaves the tenant's account row; external
/// accounts only ever carry the public PEM.
pub struct ActorKeyPair {
    private_key: RsaPrivateKey,
    private_pem: String,
    public_pem: String,
}

impl ActorKeyPair {
    /// Key size for freshly initialised actors.
    pub const KEY_BITS: usize = 2048;

    /// Generate the key pair for a new internal actor.
    pub fn generate() -> AppResult<Self> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), Self::KEY_BITS)
            .map_err(|e| AppError::Internal(format!("Failed to generate actor key: {e}")))?;
        Self::from_private_key(private_key)
    }

    /// Rehydrate the pair from a stored private PEM (delivery path).
    pub fn from_private_pem(pem: &str) -> AppResult<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| AppError::Internal(format!("Failed to parse actor key: {e}")))?;
        Self::from_private_key(private_key)
    }

    fn from_private_key(private_key: RsaPrivateKey) -> AppResult<Self> {
        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AppError::Internal(format!("Failed to encode private key: {e}")))?
            .to_string();
        let public_pem = RsaPublicKey::from(&private_key)
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AppError::Internal(format!("Failed to encode public key: {e}")))?;
        Ok(Self {
            private_key,
            private_pem,
            public_pem,
        })
    }

    /// Public half, PEM-encoded (published in the actor document).
    #[must_use]
    pub fn public_key_pem(&self) -> &str {
        &self.public_pem
    }

    /// Private half, PEM-encoded (persisted on the account row).
    #[must_use]
    pub fn private_key_pem(&self) -> &str {
        &self.private_pem
    }
}

/// The signed headers of one outbound POST, in apply order.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub host: String,
    pub date: String,
    pub digest: String,
    pub signature: String,
}

impl SignedHeaders {
    /// Header name/value pairs in the order they are applied to the
    /// request.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("Host", self.host.as_str()),
            ("Date", self.date.as_str()),
            ("Digest", self.digest.as_str()),
            ("Signature", self.signature.as_str()),
        ]
        .into_iter()
    }
}

/// Signs outbound inbox POSTs for one actor key.
pub struct RequestSigner<'a> {
    keys: &'a ActorKeyPair,
    key_id: &'a str,
}

impl<'a> RequestSigner<'a> {
    /// Create a signer for an actor's key.
    #[must_use]
    pub const fn new(keys: &'a ActorKeyPair, key_id: &'a str) -> Self {
        Self { keys, key_id }
    }

    /// Produce the signed header set for a POST of `body` to `target`.
    ///
    /// Covers exactly [`SIGNED_HEADER_NAMES`]; the date is stamped
    /// here so the signature and the sent header cannot drift.
    pub fn sign_post(&self, target: &Url, body: &[u8]) -> AppResult<SignedHeaders> {
        let host = target
            .host_str()
            .ok_or_else(|| AppError::BadRequest(format!("no host in {target}")))?
            .to_string();
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let digest = body_digest(body);

        let canonical = SIGNED_HEADER_NAMES
            .iter()
            .map(|name| match *name {
                "(request-target)" => format!("(request-target): post {}", target.path()),
                "host" => format!("host: {host}"),
                "date" => format!("date: {date}"),
                "digest" => format!("digest: {digest}"),
                other => format!("{other}: "),
            })
            .collect::<Vec<_>>()
            .join("\n");

        let signature = SigningKey::<Sha256>::new(self.keys.private_key.clone())
            .sign(canonical.as_bytes())
            .to_bytes();

        Ok(SignedHeaders {
            host,
            date,
            digest,
            signature: format!(
                r#"keyId="{}",algorithm="rsa-sha256",headers="{}",signature="{}""#,
                self.key_id,
                SIGNED_HEADER_NAMES.join(" "),
                BASE64.encode(signature)
            ),
        })
    }
}

/// Parsed HTTP Signature header.
#[derive(Debug, Clone)]
pub struct HttpSignature {
    /// Key ID (the actor's public key URL).
    pub key_id: String,
    /// Algorithm used (typically "rsa-sha256").
    pub algorithm: String,
    /// Headers included in the signature, in signing order.
    pub headers: Vec<String>,
    /// The signature itself (base64 encoded).
    pub signature: String,
}

impl HttpSignature {
    /// Parse an HTTP Signature header value.
    ///
    /// Format: `keyId="...",algorithm="...",headers="...",signature="..."`
    pub fn parse(header: &str) -> AppResult<Self> {
        let mut fields: HashMap<&str, &str> = HashMap::new();
        for part in header.split(',') {
            if let Some((key, value)) = part.trim().split_once('=') {
                fields.insert(key.trim(), value.trim_matches('"'));
            }
        }

        Ok(Self {
            key_id: fields
                .get("keyId")
                .map(|v| (*v).to_string())
                .ok_or_else(|| AppError::BadRequest("Missing keyId".to_string()))?,
            algorithm: fields
                .get("algorithm")
                .map_or_else(|| "rsa-sha256".to_string(), |v| (*v).to_string()),
            headers: fields
                .get("headers")
                .unwrap_or(&"date")
                .split(' ')
                .map(std::string::ToString::to_string)
                .collect(),
            signature: fields
                .get("signature")
                .map(|v| (*v).to_string())
                .ok_or_else(|| AppError::BadRequest("Missing signature".to_string()))?,
        })
    }

    /// Rebuild the canonical string this signature covers, from the
    /// receiver's view of the request.
    pub fn canonical_string(
        &self,
        method: &str,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> AppResult<String> {
        self.headers
            .iter()
            .map(|name| {
                if name == "(request-target)" {
                    return Ok(format!("(request-target): {} {path}", method.to_lowercase()));
                }
                headers
                    .get(&name.to_lowercase())
                    .map(|value| format!("{name}: {value}"))
                    .ok_or_else(|| AppError::BadRequest(format!("Missing header: {name}")))
            })
            .collect::<AppResult<Vec<_>>>()
            .map(|lines| lines.join("\n"))
    }
}

/// Verify an HTTP Signature against a PEM public key.
///
/// Returns `Ok(true)` only if the signature covers the given request
/// line and headers and verifies under the key.
pub fn verify_signature(
    signature: &HttpSignature,
    public_key_pem: &str,
    method: &str,
    path: &str,
    headers: &HashMap<String, String>,
) -> AppResult<bool> {
    let canonical = signature.canonical_string(method, path, headers)?;

    let sig_bytes = BASE64
        .decode(&signature.signature)
        .map_err(|e| AppError::BadRequest(format!("Invalid signature encoding: {e}")))?;
    let signature_obj = Signature::try_from(sig_bytes.as_slice())
        .map_err(|e| AppError::BadRequest(format!("Invalid signature format: {e}")))?;

    let public_key = RsaPublicKey::from_public_key_pem(public_key_pem)
        .map_err(|e| AppError::Internal(format!("Invalid public key: {e}")))?;

    Ok(VerifyingKey::<Sha256>::new(public_key)
        .verify(canonical.as_bytes(), &signature_obj)
        .is_ok())
}

/// The SHA-256 `Digest` header value of a body.
#[must_use]
pub fn body_digest(body: &[u8]) -> String {
    let mut hasher = Sha256Hasher::new();
    hasher.update(body);
    format!("SHA-256={}", BASE64.encode(hasher.finalize()))
}

/// Whether a `Digest` header matches a body.
#[must_use]
pub fn digest_matches(body: &[u8], digest_header: &str) -> bool {
    body_digest(body) == digest_header
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const KEY_ID: &str = "https://blog.example/.ghost/activitypub/users/index#main-key";

    fn inbox_url() -> Url {
        Url::parse("https://remote.example/users/alice/inbox").unwrap()
    }

    fn receiver_view(signed: &SignedHeaders) -> HashMap<String, String> {
        signed
            .iter()
            .filter(|(name, _)| *name != "Signature")
            .map(|(name, value)| (name.to_lowercase(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_generated_pair_round_trips_through_pem() {
        let keys = ActorKeyPair::generate().unwrap();
        assert!(keys.public_key_pem().contains("BEGIN PUBLIC KEY"));
        assert!(keys.private_key_pem().contains("BEGIN PRIVATE KEY"));

        let reloaded = ActorKeyPair::from_private_pem(keys.private_key_pem()).unwrap();
        assert_eq!(reloaded.public_key_pem(), keys.public_key_pem());
    }

    #[test]
    fn test_parse_signature_header() {
        let header = r#"keyId="https://remote.example/users/alice#main-key",algorithm="rsa-sha256",headers="(request-target) host date digest",signature="abc123==""#;

        let sig = HttpSignature::parse(header).unwrap();

        assert_eq!(sig.key_id, "https://remote.example/users/alice#main-key");
        assert_eq!(sig.algorithm, "rsa-sha256");
        assert_eq!(sig.headers, SIGNED_HEADER_NAMES);
        assert_eq!(sig.signature, "abc123==");
    }

    #[test]
    fn test_parse_requires_key_id_and_signature() {
        assert!(HttpSignature::parse(r#"algorithm="rsa-sha256",signature="abc==""#).is_err());
        assert!(HttpSignature::parse(r#"keyId="https://x/key""#).is_err());
    }

    #[test]
    fn test_sign_post_covers_canonical_headers() {
        let keys = ActorKeyPair::generate().unwrap();
        let signed = RequestSigner::new(&keys, KEY_ID)
            .sign_post(&inbox_url(), b"{}")
            .unwrap();

        assert_eq!(signed.host, "remote.example");
        assert!(signed.digest.starts_with("SHA-256="));

        let parsed = HttpSignature::parse(&signed.signature).unwrap();
        assert_eq!(parsed.key_id, KEY_ID);
        assert_eq!(parsed.headers, SIGNED_HEADER_NAMES);
    }

    #[test]
    fn test_sign_then_verify_round_trip() {
        let keys = ActorKeyPair::generate().unwrap();
        let body = br#"{"type":"Follow"}"#;
        let signed = RequestSigner::new(&keys, KEY_ID)
            .sign_post(&inbox_url(), body)
            .unwrap();

        let parsed = HttpSignature::parse(&signed.signature).unwrap();
        let valid = verify_signature(
            &parsed,
            keys.public_key_pem(),
            "POST",
            inbox_url().path(),
            &receiver_view(&signed),
        )
        .unwrap();
        assert!(valid);
    }

    #[test]
    fn test_verify_rejects_tampered_date() {
        let keys = ActorKeyPair::generate().unwrap();
        let signed = RequestSigner::new(&keys, KEY_ID)
            .sign_post(&inbox_url(), b"{}")
            .unwrap();

        let mut view = receiver_view(&signed);
        view.insert("date".to_string(), "Thu, 02 Jul 2026 10:00:00 GMT".to_string());

        let parsed = HttpSignature::parse(&signed.signature).unwrap();
        let valid = verify_signature(
            &parsed,
            keys.public_key_pem(),
            "POST",
            inbox_url().path(),
            &view,
        )
        .unwrap();
        assert!(!valid);
    }

    #[test]
    fn test_verify_rejects_foreign_key() {
        let signer_keys = ActorKeyPair::generate().unwrap();
        let other_keys = ActorKeyPair::generate().unwrap();
        let signed = RequestSigner::new(&signer_keys, KEY_ID)
            .sign_post(&inbox_url(), b"{}")
            .unwrap();

        let parsed = HttpSignature::parse(&signed.signature).unwrap();
        let valid = verify_signature(
            &parsed,
            other_keys.public_key_pem(),
            "POST",
            inbox_url().path(),
            &receiver_view(&signed),
        )
        .unwrap();
        assert!(!valid);
    }

    #[test]
    fn test_digest_round_trip() {
        let body = br#"{"type":"Follow"}"#;
        let digest = body_digest(body);

        assert!(digest.starts_with("SHA-256="));
        assert!(digest_matches(body, &digest));
        assert!(!digest_matches(b"{}", &digest));
    }
}
