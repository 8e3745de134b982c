//! Per-request identifiers: the CSP nonce and the trace id.
//!
//! Both are placed in request extensions on admission so downstream
//! handlers can tag inline `<script>`/`<style>` elements and correlate logs.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

/// Random bytes drawn for each nonce.
pub const NONCE_BYTES: usize = 16;

/// A single-use CSP nonce: base64 of [`NONCE_BYTES`] bytes from the OS CSPRNG.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CspNonce(String);

impl CspNonce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CspNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique trace id attached to every admitted request (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_nonce_length_and_alphabet() {
        let nonce = CspNonce::generate();
        let decoded = STANDARD.decode(nonce.as_str()).unwrap();
        assert_eq!(decoded.len(), NONCE_BYTES);
        assert!(nonce
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')));
    }

    #[test]
    fn test_nonces_not_reused() {
        let nonces: HashSet<_> = (0..1000).map(|_| CspNonce::generate()).collect();
        assert_eq!(nonces.len(), 1000);
    }

    #[test]
    fn test_request_id_is_uuid() {
        let id = RequestId::generate();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
        assert_ne!(id, RequestId::generate());
    }
}
