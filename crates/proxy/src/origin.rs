use micro_proxy_http::connection::{MessageReader, MessageWriter};
use micro_proxy_http::protocol::{Request, Response};
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::Limits;
use crate::dns;
use crate::error::UpstreamError;

/// Sends `request` to its origin server and reads back one response.
///
/// Each fetch uses a fresh connection that is closed when the response is in.
/// The request goes out in origin form, with whatever headers it carries.
///
/// # Errors
///
/// Connect, send and receive failures, and a reply whose status line doesn't parse.
pub async fn fetch(request: &Request, limits: &Limits) -> Result<Response, UpstreamError> {
    if request.host().is_empty() {
        return Err(UpstreamError::MissingHost);
    }

    let host = dns::bare_host(request.host());
    let port = request.effective_port();
    let stream = match tokio::time::timeout(limits.connect_timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(UpstreamError::Connect { host: host.to_string(), port, source }),
        Err(_) => return Err(UpstreamError::ConnectTimeout { host: host.to_string(), port, timeout: limits.connect_timeout }),
    };

    let (reader, writer) = stream.into_split();
    let mut writer = MessageWriter::new(writer);
    let mut reader = MessageReader::with_limits(reader, limits.max_header_bytes, limits.idle_timeout);

    let mut outgoing = request.clone().into_origin_form();
    writer.send(&mut outgoing).await?;
    debug!(host, port, request = outgoing.start_line(), "sent request to origin");

    let response = Response::parse(reader.receive().await?)?;
    debug!(host, port, status = %response.status(), length = response.message().body().len(), "received response from origin");
    Ok(response)
}
