//! The request gate: one security decision per inbound request.
//!
//! Checks run in a fixed order and stop at the first rejection:
//!
//! ```text
//! declared size → origin (protected namespaces) → path signatures
//!     → rate limit (client key) → admit with headers
//! ```
//!
//! The limiter is consulted last, so a request rejected by an earlier check
//! never consumes rate-limit budget.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::header::{CONTENT_LENGTH, ORIGIN};
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};

use crate::config::{GuardConfig, SecurityConfig};
use crate::http::request::{client_key, normalized_target, percent_decode};
use crate::security::headers::build_headers;
use crate::security::nonce::{CspNonce, RequestId};
use crate::security::patterns::matched_patterns;
use crate::security::rate_limit::{FixedWindowLimiter, RateLimiter};

/// Internal faults while evaluating a request. The gate never admits when
/// one of these occurs.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("cannot encode {header} header value")]
    InvalidHeaderValue { header: String },
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    RequestTooLarge,
    InvalidOrigin,
    SuspiciousPath,
    RateLimited,
}

impl RejectReason {
    pub fn status(self) -> StatusCode {
        match self {
            RejectReason::RequestTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RejectReason::InvalidOrigin => StatusCode::FORBIDDEN,
            RejectReason::SuspiciousPath => StatusCode::BAD_REQUEST,
            RejectReason::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Short response body.
    pub fn message(self) -> &'static str {
        match self {
            RejectReason::RequestTooLarge => "Request entity too large",
            RejectReason::InvalidOrigin => "Invalid origin",
            RejectReason::SuspiciousPath => "Invalid request",
            RejectReason::RateLimited => "Too Many Requests",
        }
    }

    /// Label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::RequestTooLarge => "request_too_large",
            RejectReason::InvalidOrigin => "invalid_origin",
            RejectReason::SuspiciousPath => "suspicious_path",
            RejectReason::RateLimited => "rate_limited",
        }
    }
}

/// Everything an admitted request carries forward.
#[derive(Debug, Clone)]
pub struct Admission {
    /// Headers the host merges into the eventual response.
    pub headers: HeaderMap,
    pub nonce: CspNonce,
    pub request_id: RequestId,
    pub client_key: String,
}

/// Outcome of [`RequestGate::evaluate`].
#[derive(Debug, Clone)]
pub enum SecurityDecision {
    Admit(Admission),
    Reject(RejectReason),
}

impl SecurityDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, SecurityDecision::Admit(_))
    }

    /// Status a short-circuit response should carry; `None` when admitted.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SecurityDecision::Admit(_) => None,
            SecurityDecision::Reject(reason) => Some(reason.status()),
        }
    }
}

/// The slice of a request the gate looks at.
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    /// Direct connection address, when the transport exposes one.
    pub peer: Option<IpAddr>,
}

impl<'a> GateRequest<'a> {
    /// View over an HTTP request. The peer address comes from axum's
    /// `ConnectInfo` extension when the server was started with it.
    pub fn from_request<B>(request: &'a Request<B>) -> Self {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Self {
            method: request.method(),
            uri: request.uri(),
            headers: request.headers(),
            peer,
        }
    }
}

/// Orchestrates the security checks. Cheap to clone; clones share the
/// limiter table.
#[derive(Debug, Clone)]
pub struct RequestGate {
    config: Arc<SecurityConfig>,
    limiter: Arc<dyn RateLimiter>,
}

impl RequestGate {
    pub fn new(config: SecurityConfig, limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            config: Arc::new(config),
            limiter,
        }
    }

    /// Gate with an in-memory fixed-window limiter sized from `config`.
    pub fn from_config(config: &GuardConfig) -> Self {
        let limiter = Arc::new(FixedWindowLimiter::from_config(&config.rate_limit));
        Self::new(config.security.clone(), limiter)
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    pub fn limiter(&self) -> &Arc<dyn RateLimiter> {
        &self.limiter
    }

    /// Decide whether `request` may proceed.
    pub fn evaluate(&self, request: &GateRequest<'_>) -> Result<SecurityDecision, GateError> {
        let path = request.uri.path();

        // 1. Declared size
        match declared_length(request.headers) {
            Some(length) if length <= self.config.max_request_bytes => {}
            declared => {
                tracing::debug!(
                    method = %request.method,
                    path = %path,
                    content_length = ?declared,
                    limit = self.config.max_request_bytes,
                    "Request rejected: body too large"
                );
                return Ok(SecurityDecision::Reject(RejectReason::RequestTooLarge));
            }
        }

        // 2. Origin, for protected namespaces only. Prefixes match the decoded
        // path, the same form the signature check sees.
        if self.config.is_protected_path(&percent_decode(path)) {
            if let Some(origin) = request.headers.get(ORIGIN) {
                let trusted = origin
                    .to_str()
                    .map(|o| self.config.is_trusted_origin(o))
                    .unwrap_or(false);
                if !trusted {
                    tracing::debug!(path = %path, origin = ?origin, "Request rejected: untrusted origin");
                    return Ok(SecurityDecision::Reject(RejectReason::InvalidOrigin));
                }
            }
        }

        // 3. Attack signatures
        let normalized = normalized_target(request.uri);
        let matched = matched_patterns(&normalized);
        if !matched.is_empty() {
            let labels: Vec<&str> = matched.iter().map(|p| p.as_str()).collect();
            tracing::debug!(path = %normalized, patterns = ?labels, "Request rejected: suspicious path");
            return Ok(SecurityDecision::Reject(RejectReason::SuspiciousPath));
        }

        // 4. Rate limit
        let key = client_key(
            request.headers,
            request.peer,
            self.config.trust_forwarded_headers,
            self.config.trusted_proxy_hops,
        );
        if !self.limiter.is_allowed(&key) {
            tracing::warn!(client = %key, path = %path, "Rate limit exceeded");
            return Ok(SecurityDecision::Reject(RejectReason::RateLimited));
        }

        // 5. Admit
        let nonce = CspNonce::generate();
        let request_id = RequestId::generate();
        let headers = build_headers(nonce.as_str(), request_id.as_str())?;

        tracing::trace!(request_id = %request_id, client = %key, "Request admitted");

        Ok(SecurityDecision::Admit(Admission {
            headers,
            nonce,
            request_id,
            client_key: key,
        }))
    }
}

/// Declared body size. A missing header counts as zero; a header that is
/// not a plain integer yields `None` and is treated as oversized.
fn declared_length(headers: &HeaderMap) -> Option<u64> {
    match headers.get(CONTENT_LENGTH) {
        None => Some(0),
        Some(value) => value.to_str().ok()?.trim().parse().ok(),
    }
}
