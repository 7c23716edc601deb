//! SSRF (Server-Side Request Forgery) validation for URL imports
//!
//! Rejects private/internal addresses and hostnames, enforces the optional
//! host allowlist, and checks resolved addresses so DNS cannot be used to
//! point an import at the internal network.

use std::net::{IpAddr, Ipv6Addr};
use tokio::net::lookup_host;

/// Validate an import URL.
///
/// # Arguments
/// * `url` - URL to validate
/// * `allow_private_ips` - If true, private and loopback targets are accepted (development only)
/// * `allowlist` - Optional list of allowed domains; subdomains of an entry also match
///
/// # Returns
/// Ok(()) if URL is safe, Err with error message if unsafe
pub async fn validate_url_for_ssrf(
    url: &str,
    allow_private_ips: bool,
    allowlist: Option<&[String]>,
) -> Result<(), String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err("URL must start with http:// or https://".to_string());
    }

    let parsed_url = reqwest::Url::parse(url).map_err(|e| format!("Invalid URL format: {}", e))?;

    let host = parsed_url
        .host_str()
        .ok_or_else(|| "URL must have a host".to_string())?;
    // IPv6 literals come back bracketed
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let host_lower = host.to_lowercase();

    if let Some(allowed_domains) = allowlist {
        let is_allowed = allowed_domains.iter().any(|allowed| {
            let allowed_lower = allowed.to_lowercase();
            host_lower == allowed_lower || host_lower.ends_with(&format!(".{}", allowed_lower))
        });

        if !is_allowed {
            return Err(format!(
                "URL hostname '{}' is not in the allowed list. Allowed domains: {}",
                host,
                allowed_domains.join(", ")
            ));
        }
    }

    if allow_private_ips {
        return Ok(());
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err("Private/internal IP addresses are not allowed".to_string());
        }
        return Ok(());
    }

    if host_lower == "localhost"
        || host_lower.ends_with(".localhost")
        || host_lower.ends_with(".local")
        || host_lower.ends_with(".internal")
        || host_lower.contains(".internal.")
        || host_lower.ends_with(".corp")
    {
        return Err("Localhost and internal hostnames are not allowed".to_string());
    }

    let port = parsed_url.port_or_known_default().unwrap_or(80);
    match lookup_host((host, port)).await {
        Ok(addrs) => {
            for addr in addrs {
                if is_private_ip(&addr.ip()) {
                    return Err(format!(
                        "Hostname resolves to private/internal IP address: {}",
                        addr.ip()
                    ));
                }
            }
        }
        Err(e) => {
            // The fetch itself will fail on an unresolvable host.
            tracing::warn!(host = %host, error = %e, "Failed to resolve hostname for SSRF validation");
        }
    }

    Ok(())
}

/// Check if an IP address is private/internal
///
/// Returns true for:
/// - IPv4 private ranges: 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
/// - IPv4 localhost: 127.0.0.0/8
/// - IPv4 link-local: 169.254.0.0/16
/// - IPv4 multicast: 224.0.0.0/4
/// - IPv4 reserved: 0.0.0.0/8
/// - IPv6 loopback, unspecified, multicast, link-local (fe80::/10), unique local (fc00::/7)
/// - IPv4-mapped IPv6 addresses whose IPv4 part is any of the above
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            octets[0] == 10
                || (octets[0] == 172 && (16..=31).contains(&octets[1]))
                || (octets[0] == 192 && octets[1] == 168)
                || octets[0] == 127
                || (octets[0] == 169 && octets[1] == 254)
                || (224..=239).contains(&octets[0])
                || octets[0] == 0
        }
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(mapped));
            }
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || ipv6.is_multicast()
                || is_ipv6_link_local(ipv6)
                || is_ipv6_unique_local(ipv6)
        }
    }
}

/// fe80::/10
fn is_ipv6_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

/// fc00::/7
fn is_ipv6_unique_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xfe00 == 0xfc00
}
