use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use micro_proxy_cache::CacheError;
use micro_proxy_http::protocol::HttpError;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::orchestrator::{ProxyContext, handle_client};

/// The accept loop.
#[derive(Debug)]
pub struct Server {
    ctx: Arc<ProxyContext>,
}

impl Server {
    pub fn new(ctx: ProxyContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn context(&self) -> &Arc<ProxyContext> {
        &self.ctx
    }

    /// Binds the configured port on all interfaces.
    ///
    /// # Errors
    ///
    /// Returns the bind error, typically the port being in use.
    pub async fn bind(&self) -> io::Result<TcpListener> {
        let address = SocketAddr::from(([0, 0, 0, 0], self.ctx.config().port));
        let listener = TcpListener::bind(address).await?;
        info!(address = %listener.local_addr()?, "start listening");
        Ok(listener)
    }

    /// Serves connections from `listener` until `shutdown` completes.
    ///
    /// Every connection runs on its own task. Once `shutdown` fires no new
    /// connection is accepted, the ones in flight are allowed to finish, and the
    /// cache is torn down.
    ///
    /// # Errors
    ///
    /// Fails only if the cache can't remove its files.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), CacheError>
    where
        F: Future<Output = ()>,
    {
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!(in_flight = connections.len(), "shutting down, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(stream_and_addr) => stream_and_addr,
                        Err(e) => {
                            warn!(cause = %e, "failed to accept");
                            continue;
                        }
                    };

                    let ctx = Arc::clone(&self.ctx);
                    connections.spawn(async move {
                        match handle_client(&ctx, stream, peer).await {
                            Ok(()) => debug!(%peer, "finished process, connection shutdown"),
                            Err(HttpError::ReceiveError { source }) => {
                                debug!(%peer, cause = %source, "client went away or went silent before sending a full request");
                            }
                            Err(e) => warn!(%peer, cause = %e, "connection shutdown with error"),
                        }
                    });
                }
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        error!(cause = %e, "connection task failed");
                    }
                }
            }
        }

        drop(listener);
        while let Some(finished) = connections.join_next().await {
            if let Err(e) = finished {
                error!(cause = %e, "connection task failed");
            }
        }

        self.ctx.cache().shutdown().await?;
        info!("cache cleared, proxy stopped");
        Ok(())
    }
}
