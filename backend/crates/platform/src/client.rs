//! Client identification utilities
//!
//! Resolves the caller's address from the connection, optionally honoring a
//! forwarded-address header set by a trusted reverse proxy.

use http::HeaderMap;
use std::net::IpAddr;

/// Header set by Cloudflare carrying the original client address
pub const DEFAULT_PROXY_HEADER: &str = "CF-Connecting-IP";

/// Extract client IP address
///
/// When `trusted_header` is set, the first entry of that header is used
/// (so `X-Forwarded-For` style lists work too). Anything unparsable falls
/// back to the direct connection IP. With no trusted header, forwarded
/// headers are ignored because any client can set them.
///
/// ## Arguments
/// * `headers` - HTTP request headers
/// * `direct_ip` - Direct connection IP address
/// * `trusted_header` - Header name to honor, if running behind a known proxy
///
/// ## Returns
/// The client IP address, or None if not determinable
pub fn extract_client_ip(
    headers: &HeaderMap,
    direct_ip: Option<IpAddr>,
    trusted_header: Option<&str>,
) -> Option<IpAddr> {
    let Some(name) = trusted_header else {
        return direct_ip;
    };

    if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
        if let Some(first) = value.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
        tracing::debug!(header = name, "Unparsable forwarded address, using peer address");
    }
    direct_ip
}
