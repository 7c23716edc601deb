//! IP address extraction utilities
//!
//! Provides extraction of client IP addresses from X-Forwarded-For headers
//! with validation to prevent header spoofing attacks.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Extract and validate client IP from request headers
///
/// Forwarding headers are only consulted when `trusted_proxy_count` is non-zero;
/// otherwise anyone could pick their own rate-limit key. With N trusted proxies
/// the client is the entry just before the last N in `X-Forwarded-For`.
///
/// Returns "unknown" if no address can be determined.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if trusted_proxy_count > 0 {
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|value| extract_from_forwarded_for(value, trusted_proxy_count))
        {
            return ip;
        }

        // X-Real-IP (single IP, set by some proxies)
        if let Some(real_ip) = headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|ip| is_valid_ip(ip))
        {
            return real_ip.to_string();
        }
    }

    socket_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn extract_from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<String> {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    // Chain shorter than the trusted hops: take the furthest entry we have.
    let position = ips.len().saturating_sub(trusted_proxy_count + 1);
    ips.get(position)
        .filter(|ip| is_valid_ip(ip))
        .map(|ip| ip.to_string())
}

fn is_valid_ip(ip_str: &str) -> bool {
    ip_str.parse::<IpAddr>().is_ok()
}
