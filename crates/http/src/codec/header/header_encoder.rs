//! Encoder for the head of an HTTP/1.1 message.
//!
//! Writes the start line and every header exactly as held by the
//! [`HeaderTable`], followed by the blank line that ends the head. The body is
//! left to the caller, which lets the writer stream it from a file instead.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{HeaderTable, SendError};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

#[derive(Debug)]
pub struct HeaderEncoder;

impl<'a> Encoder<(&'a str, &'a HeaderTable)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (&'a str, &'a HeaderTable), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (start_line, headers) = item;
        put_head(start_line, headers, dst);
        Ok(())
    }
}

/// Writes the start line, every header and the closing blank line into `dst`.
pub(crate) fn put_head(start_line: &str, headers: &HeaderTable, dst: &mut BytesMut) {
    dst.reserve(INIT_HEADER_SIZE.max(start_line.len() + 2));
    dst.put_slice(start_line.as_bytes());
    dst.put_slice(b"\r\n");

    for (name, value) in headers {
        dst.put_slice(name.as_bytes());
        dst.put_slice(b": ");
        dst.put_slice(value.as_bytes());
        dst.put_slice(b"\r\n");
    }
    dst.put_slice(b"\r\n");
}
