use std::io;
use std::net::IpAddr;

use tokio::net::lookup_host;

/// Strips the brackets an IPv6 literal carries inside a URI authority.
pub fn bare_host(host: &str) -> &str {
    host.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(host)
}

/// Resolves `host` to the addresses it names, deduplicated, in resolver order.
///
/// IP literals (bracketed or not) come back as themselves without touching DNS,
/// so `127.0.0.1`, `[::1]` and `::1` all compare by their canonical form.
///
/// # Errors
///
/// Returns the resolver's error if `host` is a name that doesn't resolve.
pub async fn canonical_ips(host: &str) -> io::Result<Vec<IpAddr>> {
    let host = bare_host(host);
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }

    let mut ips = Vec::new();
    for addr in lookup_host((host, 0)).await? {
        if !ips.contains(&addr.ip()) {
            ips.push(addr.ip());
        }
    }
    Ok(ips)
}
