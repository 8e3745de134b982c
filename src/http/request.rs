//! Request inspection helpers.
//!
//! # Responsibilities
//! - Produce the normalized target the signature detector inspects
//! - Derive the client identity used as the rate-limit key
//!
//! # Design Decisions
//! - Percent-encoding is undone before inspection, so `%2e%2e` is seen as `..`
//! - Forwarded-client headers are only honoured when configured, and only
//!   when they carry an IP address
//! - `X-Forwarded-For` is read from the right: each proxy appends the peer it
//!   saw, so only entries written by trusted hops identify the client

use std::borrow::Cow;
use std::net::IpAddr;

use axum::http::{HeaderMap, HeaderName, Uri};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Rate-limit key for requests with no identifiable client.
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Decoded path, plus `?` and the decoded query when one is present.
/// `+` in the query is read as a space.
pub fn normalized_target(uri: &Uri) -> String {
    let mut target = percent_decode(uri.path()).into_owned();
    if let Some(query) = uri.query() {
        target.push('?');
        target.push_str(&percent_decode(&query.replace('+', " ")));
    }
    target
}

/// Decode `%XX` escapes. Malformed escapes are kept verbatim and invalid
/// UTF-8 is replaced, so the result is always inspectable.
pub fn percent_decode(input: &str) -> Cow<'_, str> {
    if !input.contains('%') {
        return Cow::Borrowed(input);
    }

    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                decoded.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    Cow::Owned(String::from_utf8_lossy(&decoded).into_owned())
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Client identity: forwarded client IP (when trusted), then the peer
/// address, then [`ANONYMOUS_KEY`].
///
/// `trusted_hops` is the number of proxies in front of the guard; the client
/// is the `X-Forwarded-For` entry that many places from the right.
pub fn client_key(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    trust_forwarded: bool,
    trusted_hops: usize,
) -> String {
    if trust_forwarded {
        if let Some(ip) = forwarded_ip(headers, trusted_hops) {
            return ip.to_string();
        }
    }

    peer.map(|ip| ip.to_string())
        .unwrap_or_else(|| ANONYMOUS_KEY.to_string())
}

/// `X-Forwarded-For` entry `trusted_hops` from the right, else `X-Real-IP`.
/// A chain shorter than `trusted_hops` yields nothing from that header.
fn forwarded_ip(headers: &HeaderMap, trusted_hops: usize) -> Option<IpAddr> {
    let from_xff = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let hops = trusted_hops.checked_sub(1)?;
            v.rsplit(',').nth(hops)
        })
        .and_then(|entry| entry.trim().parse().ok());

    from_xff.or_else(|| {
        headers
            .get(X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}
