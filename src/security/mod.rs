//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → gate.rs (orchestration, first rejection wins)
//!         → declared size, origin
//!         → patterns.rs (attack signatures on the normalized path)
//!         → rate_limit.rs (fixed window per client key)
//!     → nonce.rs + headers.rs (CSP and hardening headers on admission)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: internal faults reject, never admit
//! - No trust in client input

pub mod gate;
pub mod headers;
pub mod nonce;
pub mod patterns;
pub mod rate_limit;

pub use gate::{Admission, GateError, GateRequest, RejectReason, RequestGate, SecurityDecision};
pub use headers::{build_headers, ContentSecurityPolicy};
pub use nonce::{CspNonce, RequestId};
pub use patterns::{is_suspicious, matched_patterns, SuspiciousPattern};
pub use rate_limit::{FixedWindowLimiter, RateLimiter, RateWindowEntry};
