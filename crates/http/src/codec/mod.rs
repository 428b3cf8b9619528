//! HTTP/1.1 framing on top of `tokio_util::codec`.
//!
//! - [`MessageDecoder`]: turns a byte stream into complete [`Message`](crate::protocol::Message)s,
//!   built from a [`HeaderDecoder`] for the head and a length decoder for the body
//! - [`MessageEncoder`]: writes a message back in wire format
//! - [`HeaderEncoder`]: writes only the head, for bodies streamed from elsewhere
//!
//! Decoding never consumes bytes past the end of the current message.

mod body;
mod header;
mod message_decoder;
mod message_encoder;

pub use header::HeaderDecoder;
pub use header::HeaderEncoder;
pub use header::MAX_HEADER_BYTES;
pub use header::MessageHead;
pub(crate) use header::put_head;
pub use message_decoder::MessageDecoder;
pub use message_encoder::MessageEncoder;
