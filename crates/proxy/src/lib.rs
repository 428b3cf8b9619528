//! A forward HTTP/1.1 proxy with a disk cache.
//!
//! Clients send one request per connection. Requests to blocked hosts are
//! refused, cacheable `GET`s are served from a [`Cache`](micro_proxy_cache::Cache)
//! shared by all connections, and everything else is relayed to the origin
//! server over a fresh connection.
//!
//! The pieces are wired together by the `proxy` binary:
//!
//! ```no_run
//! use std::sync::Arc;
//! use micro_proxy::{Blocklist, ProxyConfig, ProxyContext, Server};
//! use micro_proxy_cache::Cache;
//!
//! # async fn run(config: ProxyConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(Cache::new(config.cache_config())?);
//! let blocklist = Blocklist::load(&config.blocklist).await?;
//! let server = Server::new(ProxyContext::new(config, cache, blocklist));
//!
//! let listener = server.bind().await?;
//! server.run(listener, async { tokio::signal::ctrl_c().await.unwrap_or(()) }).await?;
//! # Ok(())
//! # }
//! ```

pub mod blocklist;
pub mod config;
pub mod dns;
pub mod error;
pub mod orchestrator;
pub mod origin;
pub mod server;

pub use blocklist::Blocklist;
pub use config::{Cli, Limits, ProxyConfig};
pub use error::{ConfigError, ProxyError, UpstreamError};
pub use orchestrator::{ProxyContext, handle_client};
pub use server::Server;
