//! Request correlation for HTTP handlers
//!
//! Each inbound request gets a [`RequestContext`]. When the caller already
//! carries a W3C `traceparent` header, the context joins that trace as a
//! child span; otherwise a new trace is started. The request id is taken from
//! an `x-request-id` header when one is supplied.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation data for one handled request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Trace this request belongs to
    pub trace_id: Uuid,

    /// Span id for the handling of this request
    pub span_id: Uuid,

    /// Remote caller's span, when propagated via `traceparent`
    pub parent_span_id: Option<Uuid>,

    /// Identifier echoed back to the caller
    pub request_id: String,
}

impl RequestContext {
    /// Start a new trace
    pub fn new_root() -> Self {
        let trace_id = Uuid::new_v4();
        Self {
            trace_id,
            span_id: Uuid::new_v4(),
            parent_span_id: None,
            request_id: trace_id.simple().to_string(),
        }
    }

    /// Join the trace described by a W3C `traceparent` header value
    ///
    /// Format: `00-{32 hex trace id}-{16 hex span id}-{2 hex flags}`
    pub fn from_traceparent(traceparent: &str) -> Option<Self> {
        let parts: Vec<&str> = traceparent.trim().split('-').collect();
        if parts.len() != 4 || parts[1].len() != 32 || parts[2].len() != 16 {
            return None;
        }

        let trace_id = Uuid::parse_str(parts[1]).ok()?;
        // Span ID in W3C format is 16 hex chars, we need to pad to 32 for UUID
        let remote_span = Uuid::parse_str(&format!("{}0000000000000000", parts[2])).ok()?;

        Some(Self {
            trace_id,
            span_id: Uuid::new_v4(),
            parent_span_id: Some(remote_span),
            request_id: trace_id.simple().to_string(),
        })
    }

    /// Build a context from optional `traceparent` and `x-request-id` values
    pub fn from_headers(traceparent: Option<&str>, request_id: Option<&str>) -> Self {
        let mut ctx = traceparent
            .and_then(Self::from_traceparent)
            .unwrap_or_else(Self::new_root);

        if let Some(id) = request_id.map(str::trim).filter(|id| !id.is_empty()) {
            ctx.request_id = id.to_string();
        }
        ctx
    }

    /// W3C `traceparent` value naming this request's span
    pub fn to_traceparent(&self) -> String {
        let trace_id_hex = self.trace_id.as_simple().to_string();
        let span_id_hex = &self.span_id.as_simple().to_string()[..16];
        format!("00-{}-{}-01", trace_id_hex, span_id_hex)
    }

    pub fn request_id_str(&self) -> &str {
        &self.request_id
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new_root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_root_context() {
        let ctx = RequestContext::new_root();
        assert!(ctx.parent_span_id.is_none());
        assert_eq!(ctx.request_id, ctx.trace_id.simple().to_string());
    }

    #[test]
    fn test_traceparent_roundtrip() {
        let ctx = RequestContext::new_root();
        let traceparent = ctx.to_traceparent();

        assert!(traceparent.starts_with("00-"));

        let parsed = RequestContext::from_traceparent(&traceparent).unwrap();
        assert_eq!(parsed.trace_id, ctx.trace_id);
        assert!(parsed.parent_span_id.is_some());
        assert_ne!(parsed.span_id, ctx.span_id);
    }

    #[test]
    fn test_malformed_traceparent() {
        assert!(RequestContext::from_traceparent("").is_none());
        assert!(RequestContext::from_traceparent("00-abc-def-01").is_none());
        assert!(
            RequestContext::from_traceparent(
                "00-zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz-00f067aa0ba902b7-01"
            )
            .is_none()
        );
    }

    #[test]
    fn test_from_headers_prefers_explicit_request_id() {
        let ctx = RequestContext::from_headers(
            Some("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
            Some("req-123"),
        );
        assert_eq!(ctx.trace_id.to_string(), "4bf92f35-77b3-4da6-a3ce-929d0e0e4736");
        assert_eq!(ctx.request_id_str(), "req-123");
    }

    #[test]
    fn test_from_headers_falls_back_to_new_trace() {
        let ctx = RequestContext::from_headers(Some("garbage"), Some("   "));
        assert!(ctx.parent_span_id.is_none());
        assert_eq!(ctx.request_id, ctx.trace_id.simple().to_string());
    }
}
