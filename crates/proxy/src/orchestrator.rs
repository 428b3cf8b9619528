//! One client connection, one request, one response.
//!
//! A connection is read up to one request, which is refused if malformed (400)
//! or aimed at a blocked host (403). Otherwise its proxy headers are rewritten
//! and it is answered from the cache (cacheable requests) or straight from the
//! origin. Anything that goes wrong past that point is a 500. The client
//! connection is always closed after the response.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use micro_proxy_cache::{Cache, EntryRef, make_resolver};
use micro_proxy_http::connection::{MessageReader, MessageWriter};
use micro_proxy_http::protocol::{HeaderTable, HttpError, Message, Request, Response};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::blocklist::Blocklist;
use crate::config::{Limits, ProxyConfig};
use crate::error::ProxyError;
use crate::origin;

const CONNECTION: &str = "Connection";
const FORWARDED: &str = "Forwarded";
const VIA: &str = "Via";
const PROXY_ONLY_HEADERS: [&str; 3] = ["Proxy-Connection", "Proxy-Authorization", "Proxy-Authenticate"];

/// Everything a connection handler needs, shared by all of them.
#[derive(Debug)]
pub struct ProxyContext {
    config: ProxyConfig,
    limits: Limits,
    cache: Arc<Cache>,
    blocklist: Blocklist,
}

impl ProxyContext {
    pub fn new(config: ProxyConfig, cache: Arc<Cache>, blocklist: Blocklist) -> Self {
        let limits = config.limits();
        Self { config, limits, cache, blocklist }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }
}

/// Serves a single request arriving on `stream` from `peer`.
///
/// A client that disconnects or goes silent before completing its request gets
/// no reply; every other outcome sends exactly one response.
///
/// # Errors
///
/// - [`HttpError::ReceiveError`] if the client hung up or timed out mid-request
/// - [`HttpError::SendError`] if the response could not be written
pub async fn handle_client<S>(ctx: &ProxyContext, stream: S, peer: SocketAddr) -> Result<(), HttpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut reader = MessageReader::with_limits(reader, ctx.limits.max_header_bytes, ctx.limits.idle_timeout);
    let mut writer = MessageWriter::new(writer);

    let mut response = match serve(ctx, &mut reader, peer).await {
        Ok(response) => response,
        Err(ProxyError::BadRequest { source }) if source.is_disconnect() => return Err(source.into()),
        Err(e) => {
            let status = e.status();
            warn!(%peer, %status, cause = %e, "failed to serve request");
            Response::error(status)
        }
    };

    response.message_mut().headers_mut().insert(CONNECTION, "close");
    writer.send(response.message_mut()).await?;
    Ok(())
}

async fn serve<R>(ctx: &ProxyContext, reader: &mut MessageReader<R>, peer: SocketAddr) -> Result<Response, ProxyError>
where
    R: AsyncRead + Unpin,
{
    let message = reader.receive().await?;
    let mut request = Request::parse(message)?;
    info!(%peer, %request, "received request");

    if ctx.blocklist.is_blocked(request.host()).await {
        return Err(ProxyError::blocked(request.host()));
    }

    rewrite_headers(request.message_mut().headers_mut(), peer.ip(), &ctx.config.via);

    let response = match request.fingerprint() {
        Some(fingerprint) => fetch_cached(ctx, &fingerprint, &request).await?,
        None => origin::fetch(&request, &ctx.limits).await?,
    };
    info!(%peer, %request, status = %response.status(), "responding");
    Ok(response)
}

/// Answers from the cache, fetching from the origin on a miss.
async fn fetch_cached(ctx: &ProxyContext, fingerprint: &str, request: &Request) -> Result<Response, ProxyError> {
    let cache: &Cache = &ctx.cache;
    let limits = &ctx.limits;

    let resolver = make_resolver(move |entry: EntryRef| async move {
        debug!(key = %entry.key(), "cache miss, fetching from origin");
        let response = origin::fetch(request, limits).await?;
        cache.set(&entry, &response.message().to_bytes()).await?;
        Ok::<(), ProxyError>(())
    });

    let bytes = cache.get(fingerprint, &resolver).await?;
    let message = Message::from_bytes(&bytes).map_err(|source| ProxyError::Stored { source })?;
    Response::parse(message).map_err(|source| ProxyError::Stored { source })
}

/// Prepares a client request for the origin.
///
/// The connection to the origin is not kept open, the client address goes
/// into `Forwarded`, the proxy names itself in `Via`, and headers meant for
/// this proxy are removed.
pub fn rewrite_headers(headers: &mut HeaderTable, client: IpAddr, via: &str) {
    headers.insert(CONNECTION, "close");
    headers.insert(FORWARDED, client.to_string());
    headers.insert(VIA, via);
    for name in PROXY_ONLY_HEADERS {
        while headers.remove(name) {}
    }
}
