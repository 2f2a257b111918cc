use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;
use url::Url;

use crate::errors::AppResult;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const USER_AGENT: &str = concat!("feedrelay/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client.
///
/// With a proxy configured every request goes through it, except requests
/// to `localhost` or to loopback/private/link-local IP literals.
pub fn build_client(proxy_url: Option<&str>, timeout: Duration) -> AppResult<Client> {
    let builder = Client::builder().timeout(timeout).user_agent(USER_AGENT);
    let builder = apply_proxy(builder, proxy_url);
    Ok(builder.build()?)
}

fn apply_proxy(builder: ClientBuilder, proxy_url: Option<&str>) -> ClientBuilder {
    let Some(raw) = proxy_url.map(str::trim).filter(|s| !s.is_empty()) else {
        return builder.no_proxy();
    };

    let proxy = match Url::parse(raw) {
        Ok(proxy) => proxy,
        Err(error) => {
            warn!(proxy_url = %raw, error = %error, "Invalid proxy URL; disabling proxy");
            return builder.no_proxy();
        }
    };

    builder.proxy(Proxy::custom(move |target: &Url| {
        match target.host_str() {
            Some(host) if is_local_host(host) => None,
            _ => Some(proxy.clone()),
        }
    }))
}

/// True for hosts that must never be sent through the forwarding proxy.
pub fn is_local_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.eq_ignore_ascii_case("localhost") || host.to_ascii_lowercase().ends_with(".localhost") {
        return true;
    }
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => is_local_v4(ip),
        Ok(IpAddr::V6(ip)) => is_local_v6(ip),
        Err(_) => false,
    }
}

fn is_local_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
}

fn is_local_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_local_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_hosts_bypass_proxy() {
        assert!(is_local_host("localhost"));
        assert!(is_local_host("LOCALHOST"));
        assert!(is_local_host("api.localhost"));
        assert!(is_local_host("127.0.0.1"));
        assert!(is_local_host("10.1.2.3"));
        assert!(is_local_host("172.16.0.9"));
        assert!(is_local_host("192.168.1.20"));
        assert!(is_local_host("169.254.10.10"));
        assert!(is_local_host("[::1]"));
        assert!(is_local_host("fd12:3456::1"));
        assert!(is_local_host("fe80::1"));
        assert!(is_local_host("::ffff:192.168.0.1"));
    }

    #[test]
    fn test_public_hosts_use_proxy() {
        assert!(!is_local_host("api.telegram.org"));
        assert!(!is_local_host("open.feishu.cn"));
        assert!(!is_local_host("8.8.8.8"));
        assert!(!is_local_host("172.32.0.1"));
        assert!(!is_local_host("2001:4860:4860::8888"));
    }

    #[test]
    fn test_build_client_accepts_missing_or_bad_proxy() {
        assert!(build_client(None, DEFAULT_TIMEOUT).is_ok());
        assert!(build_client(Some(""), DEFAULT_TIMEOUT).is_ok());
        assert!(build_client(Some("http://127.0.0.1:7890"), DEFAULT_TIMEOUT).is_ok());
        assert!(build_client(Some("not a url"), DEFAULT_TIMEOUT).is_ok());
    }
}
