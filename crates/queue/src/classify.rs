//! Delivery error classification.
//!
//! Structural classification comes first (status codes, timeouts,
//! connection failures); string heuristics remain as a fallback for
//! errors that resurface as bare text through the push transport.
//! Anything unclassified is retried.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// A failed delivery attempt.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// The remote inbox answered with a non-success status.
    #[error("({status} {reason})")]
    Http { status: u16, reason: String },

    /// The request timed out.
    #[error("timeout delivering to {0}")]
    Timeout(String),

    /// The connection failed (DNS, TLS, reset, refused).
    #[error("connection error: {0}")]
    Connect(String),

    /// Anything else, including errors replayed as text.
    #[error("{0}")]
    Other(String),
}

/// Whether a failed delivery should be retried or recorded as a
/// permanent failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Retryable,
    Permanent,
}

/// Status code embedded in an error string, e.g. "(403 Forbidden)".
#[allow(clippy::expect_used)] // the pattern is a literal
static STATUS_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(?\b([45]\d\d)\b").expect("valid regex"));

/// Classify a status code.
#[must_use]
pub const fn classify_status(status: u16) -> Classification {
    match status {
        408 | 429 | 500..=599 => Classification::Retryable,
        400..=499 => Classification::Permanent,
        _ => Classification::Retryable,
    }
}

/// Classify a delivery error.
#[must_use]
pub fn classify_delivery_error(error: &DeliveryError) -> Classification {
    match error {
        DeliveryError::Http { status, .. } => classify_status(*status),
        DeliveryError::Timeout(_) | DeliveryError::Connect(_) => Classification::Retryable,
        DeliveryError::Other(text) => classify_text(text),
    }
}

/// Heuristic classification of an error that arrives as bare text.
#[must_use]
pub fn classify_text(text: &str) -> Classification {
    let lowered = text.to_lowercase();
    if lowered.contains("timeout")
        || lowered.contains("econnreset")
        || lowered.contains("econnrefused")
        || lowered.contains("429")
    {
        return Classification::Retryable;
    }

    if let Some(captures) = STATUS_IN_TEXT.captures(text) {
        if let Some(status) = captures.get(1).and_then(|m| m.as_str().parse::<u16>().ok()) {
            return classify_status(status);
        }
    }

    // Unclassified errors are retried.
    Classification::Retryable
}

impl DeliveryError {
    /// Build from a reqwest error.
    #[must_use]
    pub fn from_reqwest(error: &reqwest::Error, inbox: &str) -> Self {
        if error.is_timeout() {
            Self::Timeout(inbox.to_string())
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else {
            Self::Other(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(500), Classification::Retryable);
        assert_eq!(classify_status(503), Classification::Retryable);
        assert_eq!(classify_status(408), Classification::Retryable);
        assert_eq!(classify_status(429), Classification::Retryable);
        assert_eq!(classify_status(403), Classification::Permanent);
        assert_eq!(classify_status(404), Classification::Permanent);
        assert_eq!(classify_status(410), Classification::Permanent);
    }

    #[test]
    fn test_structural_classification() {
        assert_eq!(
            classify_delivery_error(&DeliveryError::Http {
                status: 502,
                reason: "Bad Gateway".to_string()
            }),
            Classification::Retryable
        );
        assert_eq!(
            classify_delivery_error(&DeliveryError::Http {
                status: 403,
                reason: "Forbidden".to_string()
            }),
            Classification::Permanent
        );
        assert_eq!(
            classify_delivery_error(&DeliveryError::Timeout("https://x/inbox".to_string())),
            Classification::Retryable
        );
        assert_eq!(
            classify_delivery_error(&DeliveryError::Connect("reset".to_string())),
            Classification::Retryable
        );
    }

    #[test]
    fn test_text_heuristics() {
        // Spec-mandated heuristics for errors replayed as text.
        assert_eq!(classify_text("(502 Bad Gateway)"), Classification::Retryable);
        assert_eq!(classify_text("request timeout"), Classification::Retryable);
        assert_eq!(classify_text("ECONNRESET"), Classification::Retryable);
        assert_eq!(classify_text("got 429 from remote"), Classification::Retryable);
        assert_eq!(classify_text("(403 Forbidden)"), Classification::Permanent);
        assert_eq!(classify_text("(404 Not Found)"), Classification::Permanent);
        // 408 in text still retries.
        assert_eq!(classify_text("(408 Request Timeout)"), Classification::Retryable);
        // Unknown errors retry.
        assert_eq!(classify_text("something odd"), Classification::Retryable);
    }
}
