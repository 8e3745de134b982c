//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply environment overrides)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Malformed values fail startup instead of being coerced

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, load_with_env, ConfigError};
pub use schema::{
    GuardConfig, ListenerConfig, LogFormat, ObservabilityConfig, RateLimitConfig,
    SecurityConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::ValidationError;
