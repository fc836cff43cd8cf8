use std::net::Ipv4Addr;

use url::{Host, Url};

/// Reject URLs the poller should never be pointed at: non-http(s) schemes,
/// localhost, and private IPv4 ranges. Checked before any network I/O.
pub fn is_valid_feed_url(raw: &str) -> bool {
    let Ok(parsed) = Url::parse(raw) else {
        return false;
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    match parsed.host() {
        Some(Host::Domain(domain)) => !domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(addr)) => !is_private_ipv4(addr),
        Some(Host::Ipv6(_)) => true,
        None => false,
    }
}

fn is_private_ipv4(addr: Ipv4Addr) -> bool {
    addr.is_loopback() || addr.is_private()
}
