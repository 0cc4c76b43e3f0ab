use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Sentinel returned when no client address can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Resolve the originating client IP for a request.
///
/// Precedence, first present wins: the platform-injected forwarding header
/// (if configured), the first `X-Forwarded-For` entry, `X-Real-IP`, the
/// transport peer address, then [`UNKNOWN_IP`]. Absence is a normal case,
/// never an error.
pub fn resolve_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    platform_header: Option<&str>,
) -> String {
    if let Some(name) = platform_header {
        if let Some(value) = header_str(headers, name) {
            return strip_port(value);
        }
    }

    if let Some(value) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = value.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return strip_port(first);
            }
        }
    }

    if let Some(value) = header_str(headers, "x-real-ip") {
        return strip_port(value);
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_IP.to_string(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Strip a trailing `:port` from `1.2.3.4:5678` and `[::1]:5678` forms.
/// A bare IPv6 address contains more than one colon and is left intact.
fn strip_port(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return rest[..end].to_string();
        }
    }

    if raw.matches(':').count() == 1 {
        if let Some((host, _port)) = raw.split_once(':') {
            return host.to_string();
        }
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const PLATFORM: Option<&str> = Some("x-azure-clientip");

    fn peer() -> Option<SocketAddr> {
        Some(SocketAddr::from(([192, 168, 1, 1], 43210)))
    }

    #[test]
    fn test_platform_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-azure-clientip", HeaderValue::from_static("203.0.113.7"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        assert_eq!(resolve_client_ip(&headers, peer(), PLATFORM), "203.0.113.7");
    }

    #[test]
    fn test_platform_header_ignored_when_disabled() {
        let mut headers = HeaderMap::new();
        headers.insert("x-azure-clientip", HeaderValue::from_static("203.0.113.7"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.1"));

        assert_eq!(resolve_client_ip(&headers, peer(), None), "198.51.100.1");
    }

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.195, 70.41.3.18, 150.172.238.178"),
        );

        assert_eq!(
            resolve_client_ip(&headers, peer(), PLATFORM),
            "203.0.113.195"
        );
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        assert_eq!(resolve_client_ip(&headers, peer(), PLATFORM), "198.51.100.2");
    }

    #[test]
    fn test_peer_address_fallback() {
        let headers = HeaderMap::new();

        assert_eq!(resolve_client_ip(&headers, peer(), PLATFORM), "192.168.1.1");
    }

    #[test]
    fn test_unknown_when_nothing_available() {
        let headers = HeaderMap::new();

        assert_eq!(resolve_client_ip(&headers, None, PLATFORM), UNKNOWN_IP);
    }

    #[test]
    fn test_ipv4_port_is_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.195:44312"),
        );

        assert_eq!(
            resolve_client_ip(&headers, peer(), PLATFORM),
            "203.0.113.195"
        );
    }

    #[test]
    fn test_bracketed_ipv6_port_is_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("[2001:db8::1]:44312"),
        );

        assert_eq!(resolve_client_ip(&headers, peer(), PLATFORM), "2001:db8::1");
    }

    #[test]
    fn test_bare_ipv6_left_intact() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("2001:db8::1234:5678"),
        );

        assert_eq!(
            resolve_client_ip(&headers, peer(), PLATFORM),
            "2001:db8::1234:5678"
        );
    }

    #[test]
    fn test_empty_forwarded_for_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));

        assert_eq!(resolve_client_ip(&headers, peer(), PLATFORM), "198.51.100.2");
    }
}
