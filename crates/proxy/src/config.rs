//! Command line and file configuration.
//!
//! The command line keeps the classic `proxy <port> <cache_ttl> [<prefetch_depth>] [-v]`
//! shape. Everything else can come from a TOML file given with `--config`; values
//! on the command line always win over the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use micro_proxy_cache::{CacheConfig, DEFAULT_BUCKETS};
use micro_proxy_http::codec::MAX_HEADER_BYTES;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Parser)]
#[command(name = "proxy", version, about = "A forward HTTP/1.1 proxy with a disk cache")]
pub struct Cli {
    /// Port to listen on
    pub port: u16,

    /// Seconds a cached response stays fresh
    pub cache_ttl: u64,

    /// Link prefetch depth (accepted, currently unused)
    pub prefetch_depth: Option<u32>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// TOML file with further settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding cached responses
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// File listing blocked hosts and addresses
    #[arg(long, value_name = "FILE")]
    pub blocklist: Option<PathBuf>,
}

/// Settings for one proxy process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub port: u16,
    pub cache_ttl_secs: u64,
    pub prefetch_depth: u32,
    pub verbose: bool,
    pub cache_dir: PathBuf,
    pub blocklist: PathBuf,
    /// How long a single read from a client or origin may stall
    pub idle_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub max_header_bytes: usize,
    /// Value of the `Via` header added to forwarded requests
    pub via: String,
    pub cache_buckets: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cache_ttl_secs: 60,
            prefetch_depth: 0,
            verbose: false,
            cache_dir: PathBuf::from("cache"),
            blocklist: PathBuf::from("blocklist"),
            idle_timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
            max_header_bytes: MAX_HEADER_BYTES,
            via: "1.1 micro-proxy".to_string(),
            cache_buckets: DEFAULT_BUCKETS,
        }
    }
}

impl ProxyConfig {
    /// Builds the effective config: the `--config` file if given, else defaults,
    /// overridden by whatever the command line says.
    ///
    /// # Errors
    ///
    /// Fails if the file can't be read or parsed, or if the resulting TTL is zero.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        config.port = cli.port;
        config.cache_ttl_secs = cli.cache_ttl;
        config.verbose |= cli.verbose;
        if let Some(depth) = cli.prefetch_depth {
            config.prefetch_depth = depth;
        }
        if let Some(dir) = &cli.cache_dir {
            config.cache_dir.clone_from(dir);
        }
        if let Some(blocklist) = &cli.blocklist {
            config.blocklist.clone_from(blocklist);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML config file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroTtl`] when cached responses would never be fresh.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(self.cache_dir.clone(), self.cache_ttl()).with_buckets(self.cache_buckets)
    }

    pub fn limits(&self) -> Limits {
        Limits {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
            max_header_bytes: self.max_header_bytes,
        }
    }
}

/// Bounds applied to every client and origin connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Limits {
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_header_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        ProxyConfig::default().limits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::io::Write;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("proxy").chain(args.iter().copied()))
    }

    #[test]
    fn positional_arguments() {
        let cli = parse(&["8080", "30"]).unwrap();
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.cache_ttl, 30);
        assert_eq!(cli.prefetch_depth, None);
        assert!(!cli.verbose);

        let cli = parse(&["9000", "5", "2", "-v"]).unwrap();
        assert_eq!(cli.prefetch_depth, Some(2));
        assert!(cli.verbose);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["8080"]).is_err());
        assert!(parse(&["not-a-port", "30"]).is_err());
        assert!(parse(&["70000", "30"]).is_err());
        assert!(parse(&["8080", "-5"]).is_err());
        assert!(parse(&["8080", "30", "1", "extra"]).is_err());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let cli = parse(&["8080", "0"]).unwrap();
        assert!(matches!(ProxyConfig::from_cli(&cli), Err(ConfigError::ZeroTtl)));
    }

    #[test]
    fn cli_overrides_defaults() {
        let cli = parse(&["3128", "45", "--cache-dir", "/tmp/c", "--blocklist", "/tmp/b"]).unwrap();
        let config = ProxyConfig::from_cli(&cli).unwrap();

        assert_eq!(config.port, 3128);
        assert_eq!(config.cache_ttl(), Duration::from_secs(45));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/c"));
        assert_eq!(config.blocklist, PathBuf::from("/tmp/b"));
        assert_eq!(config.via, "1.1 micro-proxy");
        assert_eq!(config.max_header_bytes, MAX_HEADER_BYTES);
    }

    #[test]
    fn file_config_with_cli_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let content = indoc! {r#"
            port = 1
            cache_ttl_secs = 1
            cache_dir = "/var/cache/proxy"
            via = "1.1 test-proxy"
            idle_timeout_ms = 250
        "#};
        file.write_all(content.as_bytes()).unwrap();

        let path = file.path().to_str().unwrap();
        let cli = parse(&["8081", "20", "--config", path]).unwrap();
        let config = ProxyConfig::from_cli(&cli).unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.cache_ttl_secs, 20);
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/proxy"));
        assert_eq!(config.via, "1.1 test-proxy");
        assert_eq!(config.limits().idle_timeout, Duration::from_millis(250));
        assert_eq!(config.blocklist, PathBuf::from("blocklist"));
    }

    #[test]
    fn unparsable_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"port = \"eighty\"").unwrap();

        assert!(matches!(ProxyConfig::load(file.path()), Err(ConfigError::Parse { .. })));
        assert!(matches!(ProxyConfig::load(Path::new("/definitely/not/here.toml")), Err(ConfigError::Read { .. })));
    }
}
