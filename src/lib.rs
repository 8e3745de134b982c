//! Edge security gate.
//!
//! Runs in front of a web application and decides, per request and before
//! any route handler, whether the request may proceed:
//!
//! ```text
//!     Client Request
//!          │
//!          ▼
//!   ┌──────────────────────────────────────────────────────────┐
//!   │ RequestGate                                              │
//!   │   size ─▶ origin ─▶ path signatures ─▶ rate limit        │
//!   │    413      403          400               429           │
//!   └──────────────┬───────────────────────────────────────────┘
//!                  │ admit: nonce + request id
//!                  ▼
//!        health │ upstream passthrough
//!                  │
//!                  ▼
//!   response + CSP / hardening headers / X-Request-ID
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GuardConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::gate::{RequestGate, SecurityDecision};
