//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Maximum request size in bytes.
pub const ENV_MAX_REQUEST_SIZE: &str = "MAX_REQUEST_SIZE";
/// Comma-separated trusted origins.
pub const ENV_TRUSTED_ORIGINS: &str = "TRUSTED_ORIGINS";
/// Requests allowed per window.
pub const ENV_RATE_LIMIT_REQUESTS: &str = "RATE_LIMIT_REQUESTS";
/// Window duration in seconds.
pub const ENV_RATE_LIMIT_DURATION: &str = "RATE_LIMIT_DURATION";
/// Listener bind address.
pub const ENV_BIND: &str = "EDGE_GUARD_BIND";
/// Upstream application address.
pub const ENV_UPSTREAM: &str = "EDGE_GUARD_UPSTREAM";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value `{value}` for {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GuardConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build the process configuration: optional file, then environment
/// overrides from `lookup`, then validation.
///
/// Any unparsable value aborts loading. A limiter silently falling back to
/// defaults would be disabled without anyone noticing.
pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<GuardConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GuardConfig::default(),
    };

    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load configuration using the real process environment.
pub fn load_from_env(path: Option<&Path>) -> Result<GuardConfig, ConfigError> {
    load_with_env(path, |var| std::env::var(var).ok())
}

/// Apply environment overrides on top of `config`.
pub fn apply_env_overrides<F>(config: &mut GuardConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_MAX_REQUEST_SIZE) {
        config.security.max_request_bytes = parse_number(ENV_MAX_REQUEST_SIZE, &value)?;
    }

    if let Some(value) = lookup(ENV_TRUSTED_ORIGINS) {
        config.security.trusted_origins = parse_origin_list(&value);
    }

    if let Some(value) = lookup(ENV_RATE_LIMIT_REQUESTS) {
        config.rate_limit.max_requests = parse_number(ENV_RATE_LIMIT_REQUESTS, &value)?;
    }

    if let Some(value) = lookup(ENV_RATE_LIMIT_DURATION) {
        config.rate_limit.window_secs = parse_number(ENV_RATE_LIMIT_DURATION, &value)?;
    }

    if let Some(value) = lookup(ENV_BIND) {
        config.listener.bind_address = value.trim().to_string();
    }

    if let Some(value) = lookup(ENV_UPSTREAM) {
        let value = value.trim();
        config.upstream.address = (!value.is_empty()).then(|| value.to_string());
    }

    Ok(())
}

fn parse_number<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Split a comma-separated origin list. Blank entries are dropped; format
/// checks happen in validation.
fn parse_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let config = load_with_env(
            None,
            env(&[
                (ENV_MAX_REQUEST_SIZE, "1024"),
                (ENV_TRUSTED_ORIGINS, "https://a.example, https://b.example,,"),
                (ENV_RATE_LIMIT_REQUESTS, "10"),
                (ENV_RATE_LIMIT_DURATION, "30"),
            ]),
        )
        .unwrap();

        assert_eq!(config.security.max_request_bytes, 1024);
        assert_eq!(
            config.security.trusted_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.rate_limit.window_millis(), 30_000);
    }

    #[test]
    fn test_non_numeric_limit_fails() {
        let err = load_with_env(None, env(&[(ENV_RATE_LIMIT_REQUESTS, "lots")])).unwrap_err();
        match err {
            ConfigError::Env { var, value, .. } => {
                assert_eq!(var, ENV_RATE_LIMIT_REQUESTS);
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_limit_fails() {
        let err = load_with_env(None, env(&[(ENV_RATE_LIMIT_REQUESTS, "-5")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn test_malformed_origin_fails() {
        let err = load_with_env(None, env(&[(ENV_TRUSTED_ORIGINS, "https://ok.example,not a url")]))
            .unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::MalformedOrigin("not a url".into())]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_file_then_env() {
        let path = std::env::temp_dir().join(format!("edge-guard-{}.toml", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            r#"
            [rate_limit]
            max_requests = 7
            window_secs = 5

            [upstream]
            address = "127.0.0.1:3000"
            "#,
        )
        .unwrap();

        let config = load_with_env(Some(&path), env(&[(ENV_RATE_LIMIT_DURATION, "9")])).unwrap();
        assert_eq!(config.rate_limit.max_requests, 7);
        assert_eq!(config.rate_limit.window_secs, 9);
        assert_eq!(config.upstream.address.as_deref(), Some("127.0.0.1:3000"));

        let direct = load_config(&path).unwrap();
        assert_eq!(direct.rate_limit.window_secs, 5);

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/edge-guard.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
