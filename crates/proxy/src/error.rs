use std::io;
use std::path::PathBuf;
use std::time::Duration;

use http::StatusCode;
use micro_proxy_cache::CacheError;
use micro_proxy_http::protocol::{ParseError, SendError};
use thiserror::Error;

/// Why a request could not be served, and what the client is told about it.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("bad request: {source}")]
    BadRequest {
        #[from]
        source: ParseError,
    },

    #[error("host {host} is blocked")]
    Blocked { host: String },

    #[error("upstream error: {source}")]
    Upstream {
        #[from]
        source: UpstreamError,
    },

    #[error("cache error: {source}")]
    Cache {
        #[from]
        source: CacheError,
    },

    #[error("cached response is unreadable: {source}")]
    Stored { source: ParseError },
}

impl ProxyError {
    pub fn blocked<S: ToString>(host: S) -> Self {
        Self::Blocked { host: host.to_string() }
    }

    /// The status sent back to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Blocked { .. } => StatusCode::FORBIDDEN,
            Self::Upstream { .. } | Self::Cache { .. } | Self::Stored { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A failed exchange with the origin server.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request has no host to connect to")]
    MissingHost,

    #[error("failed to connect to {host}:{port}: {source}")]
    Connect { host: String, port: u16, source: io::Error },

    #[error("connecting to {host}:{port} timed out after {timeout:?}")]
    ConnectTimeout { host: String, port: u16, timeout: Duration },

    #[error("failed to send request to origin: {source}")]
    Send {
        #[from]
        source: SendError,
    },

    #[error("failed to receive response from origin: {source}")]
    Receive {
        #[from]
        source: ParseError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("cache ttl must be greater than zero")]
    ZeroTtl,
}
