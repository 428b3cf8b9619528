//! Encoding and decoding of the message head (start line and header block).
//!
//! - [`HeaderDecoder`]: frames a head out of raw bytes and enforces the size limits
//! - [`HeaderEncoder`]: writes a head back in wire format

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_decoder::MAX_HEADER_BYTES;
pub use header_decoder::MessageHead;
pub use header_encoder::HeaderEncoder;
pub(crate) use header_encoder::put_head;
