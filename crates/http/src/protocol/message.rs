use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::codec::{MessageDecoder, put_head};
use crate::protocol::{HeaderTable, ParseError};

pub(crate) const CONTENT_LENGTH: &str = "Content-Length";

/// A framed HTTP/1.1 message: start line, ordered headers and a fully buffered body.
///
/// The start line is kept verbatim (without its CRLF); it is interpreted later by
/// [`Request::parse`](super::Request::parse) or [`Response::parse`](super::Response::parse).
/// Requests and responses share this type because the proxy frames both
/// directions the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    start_line: String,
    headers: HeaderTable,
    body: Bytes,
}

impl Message {
    pub fn new<S: Into<String>>(start_line: S) -> Self {
        Self { start_line: start_line.into(), headers: HeaderTable::new(), body: Bytes::new() }
    }

    pub fn from_parts(start_line: String, headers: HeaderTable, body: Bytes) -> Self {
        Self { start_line, headers, body }
    }

    pub fn into_parts(self) -> (String, HeaderTable, Bytes) {
        (self.start_line, self.headers, self.body)
    }

    pub fn start_line(&self) -> &str {
        &self.start_line
    }

    pub fn set_start_line<S: Into<String>>(&mut self, start_line: S) {
        self.start_line = start_line.into();
    }

    pub fn headers(&self) -> &HeaderTable {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderTable {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replaces the body and updates `Content-Length` to match.
    pub fn set_body<B: Into<Bytes>>(&mut self, body: B) {
        self.body = body.into();
        self.sync_content_length();
    }

    /// The declared body length, 0 when the header is missing or not a number.
    pub fn content_length(&self) -> u64 {
        self.headers.get(CONTENT_LENGTH).and_then(|value| value.trim().parse().ok()).unwrap_or(0)
    }

    /// Makes `Content-Length` agree with the body actually held.
    pub fn sync_content_length(&mut self) {
        let actual = self.body.len().to_string();
        self.headers.insert(CONTENT_LENGTH, actual);
    }

    /// Serializes the message in wire format.
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.start_line.len() + self.body.len() + 256);
        put_head(&self.start_line, &self.headers, &mut dst);
        dst.put_slice(&self.body);
        dst.freeze()
    }

    /// Decodes exactly one complete message from `bytes`.
    ///
    /// Used to turn cached response files back into messages. Anything after the
    /// declared body is ignored; a truncated message is [`ParseError::ConnectionClosed`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Message, ParseError> {
        let mut src = BytesMut::from(bytes);
        let mut decoder = MessageDecoder::with_max_header_bytes(bytes.len());
        decoder.decode_eof(&mut src)?.ok_or(ParseError::ConnectionClosed)
    }
}
