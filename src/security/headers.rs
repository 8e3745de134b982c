//! Security response headers.
//!
//! # Responsibilities
//! - Build the Content-Security-Policy for a per-request nonce
//! - Build the fixed hardening headers (framing, sniffing, referrer, HSTS)
//! - Stamp the request trace id
//!
//! # Design Decisions
//! - Directive order is fixed so the rendered policy is byte-stable
//! - The same nonce is used in `script-src` and `style-src`
//! - Each header appears exactly once

use axum::http::header::{
    CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS,
    X_DNS_PREFETCH_CONTROL, X_FRAME_OPTIONS,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::security::gate::GateError;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");
pub const X_PERMITTED_CROSS_DOMAIN_POLICIES: HeaderName =
    HeaderName::from_static("x-permitted-cross-domain-policies");
pub const CROSS_ORIGIN_OPENER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-opener-policy");
pub const CROSS_ORIGIN_RESOURCE_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-resource-policy");

const HSTS: &str = "max-age=31536000; includeSubDomains";

const PERMISSIONS: &str = "accelerometer=(), camera=(), geolocation=(), gyroscope=(), \
                           magnetometer=(), microphone=(), payment=(), usb=()";

/// One CSP directive. A directive without sources renders as its bare name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    name: &'static str,
    sources: Vec<String>,
}

impl Directive {
    pub fn new<I, S>(name: &'static str, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name,
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// A directive with no source list, e.g. `upgrade-insecure-requests`.
    pub fn flag(name: &'static str) -> Self {
        Self {
            name,
            sources: Vec::new(),
        }
    }

    fn render(&self) -> String {
        if self.sources.is_empty() {
            self.name.to_string()
        } else {
            format!("{} {}", self.name, self.sources.join(" "))
        }
    }
}

/// An ordered Content-Security-Policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSecurityPolicy {
    directives: Vec<Directive>,
}

impl ContentSecurityPolicy {
    /// The policy applied to every admitted response.
    pub fn strict(nonce: &str) -> Self {
        let nonce_source = format!("'nonce-{nonce}'");
        Self {
            directives: vec![
                Directive::new("default-src", ["'self'"]),
                Directive::new(
                    "script-src",
                    ["'self'".to_string(), nonce_source.clone(), "'strict-dynamic'".to_string()],
                ),
                Directive::new("style-src", ["'self'".to_string(), nonce_source]),
                Directive::new("img-src", ["'self'", "blob:", "data:", "https:"]),
                Directive::new("font-src", ["'self'"]),
                Directive::new("object-src", ["'none'"]),
                Directive::new("base-uri", ["'self'"]),
                Directive::new("form-action", ["'self'"]),
                Directive::new("frame-ancestors", ["'none'"]),
                Directive::flag("block-all-mixed-content"),
                Directive::flag("upgrade-insecure-requests"),
            ],
        }
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Directives joined with `"; "` in declaration order.
    pub fn render(&self) -> String {
        self.directives
            .iter()
            .map(Directive::render)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Build the header set for an admitted request.
pub fn build_headers(nonce: &str, request_id: &str) -> Result<HeaderMap, GateError> {
    let csp = ContentSecurityPolicy::strict(nonce).render();

    let mut headers = HeaderMap::with_capacity(12);
    headers.insert(CONTENT_SECURITY_POLICY, header_value(&CONTENT_SECURITY_POLICY, &csp)?);
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off"));
    headers.insert(STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS));
    headers.insert(PERMISSIONS_POLICY, HeaderValue::from_static(PERMISSIONS));
    headers.insert(X_PERMITTED_CROSS_DOMAIN_POLICIES, HeaderValue::from_static("none"));
    headers.insert(CROSS_ORIGIN_OPENER_POLICY, HeaderValue::from_static("same-origin"));
    headers.insert(CROSS_ORIGIN_RESOURCE_POLICY, HeaderValue::from_static("same-origin"));
    headers.insert(X_REQUEST_ID, header_value(&X_REQUEST_ID, request_id)?);

    Ok(headers)
}

fn header_value(name: &HeaderName, value: &str) -> Result<HeaderValue, GateError> {
    HeaderValue::from_str(value).map_err(|_| GateError::InvalidHeaderValue {
        header: name.as_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED_CSP: &str = "default-src 'self'; \
        script-src 'self' 'nonce-abc123' 'strict-dynamic'; \
        style-src 'self' 'nonce-abc123'; \
        img-src 'self' blob: data: https:; \
        font-src 'self'; \
        object-src 'none'; \
        base-uri 'self'; \
        form-action 'self'; \
        frame-ancestors 'none'; \
        block-all-mixed-content; \
        upgrade-insecure-requests";

    #[test]
    fn test_csp_exact_string() {
        assert_eq!(ContentSecurityPolicy::strict("abc123").render(), EXPECTED_CSP);
    }

    #[test]
    fn test_nonce_in_script_and_style() {
        let headers = build_headers("n0nce+/=", "req-1").unwrap();
        let csp = headers[CONTENT_SECURITY_POLICY].to_str().unwrap();

        let script = csp.split("; ").find(|d| d.starts_with("script-src")).unwrap();
        let style = csp.split("; ").find(|d| d.starts_with("style-src")).unwrap();
        assert!(script.contains("'nonce-n0nce+/='"));
        assert!(style.contains("'nonce-n0nce+/='"));
    }

    #[test]
    fn test_different_nonces_differ() {
        let a = build_headers("aaaa", "id").unwrap();
        let b = build_headers("bbbb", "id").unwrap();
        assert_ne!(a[CONTENT_SECURITY_POLICY], b[CONTENT_SECURITY_POLICY]);
    }

    #[test]
    fn test_fixed_headers() {
        let headers = build_headers("n", "trace-42").unwrap();

        assert_eq!(headers[X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[REFERRER_POLICY], "strict-origin-when-cross-origin");
        assert_eq!(headers[X_DNS_PREFETCH_CONTROL], "off");
        assert_eq!(headers[STRICT_TRANSPORT_SECURITY], "max-age=31536000; includeSubDomains");
        assert_eq!(headers[X_REQUEST_ID], "trace-42");

        let permissions = headers[PERMISSIONS_POLICY].to_str().unwrap();
        for feature in ["camera=()", "microphone=()", "geolocation=()"] {
            assert!(permissions.contains(feature), "missing {feature}");
        }
    }

    #[test]
    fn test_each_header_once() {
        let headers = build_headers("n", "id").unwrap();
        assert_eq!(headers.len(), headers.keys_len());
        assert_eq!(headers.len(), 11);
    }

    #[test]
    fn test_invalid_request_id_is_error() {
        let err = build_headers("n", "bad\nid").unwrap_err();
        assert!(matches!(err, GateError::InvalidHeaderValue { ref header } if header == "x-request-id"));
    }
}
