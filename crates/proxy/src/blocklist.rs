//! Hosts and addresses the proxy refuses to contact.
//!
//! The file holds one host name or IP address per line. Blank lines and lines
//! starting with `#` are ignored. Every name is resolved once at load time, so
//! a request is refused when it names a blocked host directly or when its host
//! resolves to any address a blocked entry resolved to.

use std::io;
use std::net::IpAddr;
use std::path::Path;

use tracing::{debug, warn};

use crate::dns;

#[derive(Debug, Clone, PartialEq, Eq)]
struct BlockedHost {
    name: String,
    ips: Vec<IpAddr>,
}

#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    hosts: Vec<BlockedHost>,
}

impl Blocklist {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the blocklist file.
    ///
    /// A missing file is not an error: the proxy runs with nothing blocked and
    /// says so in the log.
    ///
    /// # Errors
    ///
    /// Any read error other than `NotFound`.
    pub async fn load(path: &Path) -> io::Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "blocklist file not found, nothing is blocked");
                return Ok(Self::empty());
            }
            Err(e) => return Err(e),
        };

        let blocklist = Self::from_lines(&content).await;
        debug!(path = %path.display(), entries = blocklist.len(), "loaded blocklist");
        Ok(blocklist)
    }

    /// Builds a blocklist from file content, resolving each entry.
    ///
    /// Names that don't resolve are still blocked by name.
    pub async fn from_lines(content: &str) -> Self {
        let mut hosts: Vec<BlockedHost> = Vec::new();
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let name = dns::bare_host(line).to_ascii_lowercase();
            if hosts.iter().any(|host| host.name == name) {
                continue;
            }

            let ips = match dns::canonical_ips(&name).await {
                Ok(ips) => ips,
                Err(e) => {
                    warn!(host = %name, cause = %e, "failed to resolve blocked host, matching by name only");
                    Vec::new()
                }
            };
            hosts.push(BlockedHost { name, ips });
        }
        Self { hosts }
    }

    /// Whether a request for `host` must be refused.
    pub async fn is_blocked(&self, host: &str) -> bool {
        if self.hosts.is_empty() {
            return false;
        }

        let name = dns::bare_host(host).to_ascii_lowercase();
        if self.hosts.iter().any(|blocked| blocked.name == name) {
            return true;
        }

        // an unresolvable request host can only match by name
        let Ok(ips) = dns::canonical_ips(&name).await else {
            return false;
        };
        self.hosts.iter().any(|blocked| blocked.ips.iter().any(|ip| ips.contains(ip)))
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
