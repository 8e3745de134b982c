//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! Returns every problem found, not just the first, and runs before the
//! config is accepted into the system.

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::GuardConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("upstream.address `{0}` is not a socket address")]
    UpstreamAddress(String),

    #[error("security.max_request_bytes must be greater than zero")]
    ZeroRequestSize,

    #[error("security.trusted_origins entry `{0}` is not a valid origin")]
    MalformedOrigin(String),

    #[error("security.protected_prefixes entry `{0}` must start with `/`")]
    RelativePrefix(String),

    #[error("security.trusted_proxy_hops must be greater than zero when forwarded headers are trusted")]
    ZeroProxyHops,

    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroWindow,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if let Some(addr) = &config.upstream.address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::UpstreamAddress(addr.clone()));
        }
    }

    if config.security.max_request_bytes == 0 {
        errors.push(ValidationError::ZeroRequestSize);
    }

    for origin in &config.security.trusted_origins {
        if !is_valid_origin(origin) {
            errors.push(ValidationError::MalformedOrigin(origin.clone()));
        }
    }

    for prefix in &config.security.protected_prefixes {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::RelativePrefix(prefix.clone()));
        }
    }

    if config.security.trust_forwarded_headers && config.security.trusted_proxy_hops == 0 {
        errors.push(ValidationError::ZeroProxyHops);
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroWindow);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// An origin is `scheme://host[:port]` with nothing after the authority,
/// matching what browsers send in the `Origin` header.
fn is_valid_origin(origin: &str) -> bool {
    let Ok(url) = Url::parse(origin) else {
        return false;
    };

    matches!(url.scheme(), "http" | "https")
        && url.host_str().is_some()
        && url.username().is_empty()
        && url.password().is_none()
        && url.query().is_none()
        && url.fragment().is_none()
        && url.origin().ascii_serialization() == origin
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GuardConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GuardConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.rate_limit.window_secs = 0;
        config.security.max_request_bytes = 0;
        config.security.protected_prefixes = vec!["api/".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroWindow));
        assert!(errors.contains(&ValidationError::RelativePrefix("api/".into())));
    }

    #[test]
    fn test_origin_format() {
        assert!(is_valid_origin("https://app.example"));
        assert!(is_valid_origin("http://localhost:3000"));
        assert!(!is_valid_origin("app.example"));
        assert!(!is_valid_origin("https://app.example/"));
        assert!(!is_valid_origin("https://app.example/path"));
        assert!(!is_valid_origin("ftp://app.example"));
        assert!(!is_valid_origin(""));
    }

    #[test]
    fn test_zero_proxy_hops() {
        let mut config = GuardConfig::default();
        config.security.trusted_proxy_hops = 0;
        assert_eq!(validate_config(&config).unwrap_err(), vec![ValidationError::ZeroProxyHops]);

        config.security.trust_forwarded_headers = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_max_requests_is_accepted() {
        let mut config = GuardConfig::default();
        config.rate_limit.max_requests = 0;
        assert!(validate_config(&config).is_ok());
    }
}
