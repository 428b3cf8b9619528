//! HTTP/1.1 message framing for the micro forward proxy.
//!
//! This crate turns raw byte streams into whole HTTP messages and back. It sits
//! under both sides of the proxy: messages read from clients and forwarded to
//! origins, and origin responses that are cached on disk and replayed later.
//! Bodies are buffered in full, delimited by `Content-Length` only.
//!
//! # Example
//!
//! ```no_run
//! use http::StatusCode;
//! use tokio::net::TcpListener;
//! use tracing::{error, info};
//! use micro_proxy_http::connection::{MessageReader, MessageWriter};
//! use micro_proxy_http::protocol::{Request, Response};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let (tcp_stream, _remote_addr) = tcp_listener.accept().await.unwrap();
//!     let (reader, writer) = tcp_stream.into_split();
//!
//!     let mut reader = MessageReader::new(reader);
//!     let mut writer = MessageWriter::new(writer);
//!
//!     let mut reply = match reader.receive().await.map(Request::parse) {
//!         Ok(Ok(request)) => {
//!             info!(host = request.host(), uri = request.uri(), "received request");
//!             let mut response = Response::error(StatusCode::NOT_IMPLEMENTED).into_message();
//!             response.set_body("not a real proxy");
//!             response
//!         }
//!         Ok(Err(e)) | Err(e) => {
//!             error!(cause = %e, "can't receive request");
//!             Response::error(StatusCode::BAD_REQUEST).into_message()
//!         }
//!     };
//!
//!     if let Err(e) = writer.send(&mut reply).await {
//!         error!(cause = %e, "can't send response");
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: [`Message`](protocol::Message), its header table and the
//!   request and response views over it
//! - [`codec`]: `tokio_util` decoder and encoder for the wire format
//! - [`connection`]: reader and writer that drive the codec over async streams
//!
//! # Limitations
//!
//! - No chunked transfer encoding
//! - No pipelining: bytes after a message stay buffered for the next `receive`
//! - Maximum head size: 8KB by default
//! - Maximum number of headers: 128

pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
