//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, ConnectInfo)
//!     → middleware.rs (security gate: reject, or admit and decorate)
//!     → health.rs | proxy.rs (upstream passthrough)
//!     → gate headers merged into the response
//!     → Send to client
//! ```

pub mod health;
pub mod middleware;
pub mod proxy;
pub mod request;
pub mod server;

pub use middleware::{guard_router, security_gate_middleware};
pub use server::{AppState, HttpServer};
