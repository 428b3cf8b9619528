//! Decoder for the head of an HTTP/1.1 message: start line plus header block.
//!
//! The start line is taken verbatim up to the first newline, so the same decoder
//! frames both requests and responses; [`Request`](crate::protocol::Request)
//! and [`Response`](crate::protocol::Response) interpret it afterwards. The
//! header block is parsed with `httparse::parse_headers`.
//!
//! # Limits
//!
//! - Maximum number of headers: 128
//! - Maximum head size: 8KB by default, see [`HeaderDecoder::with_max_header_bytes`]

use bytes::BytesMut;
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{CONTENT_LENGTH, HeaderTable, ParseError};

/// Maximum number of headers allowed in a message
pub(crate) const MAX_HEADER_NUM: usize = 128;

/// Maximum size in bytes allowed for the start line and header section
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// A decoded message head: start line, headers and the declared body length.
#[derive(Debug)]
pub struct MessageHead {
    pub start_line: String,
    pub headers: HeaderTable,
    pub content_length: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct HeaderDecoder {
    max_header_bytes: usize,
}

impl HeaderDecoder {
    pub fn new() -> Self {
        Self::with_max_header_bytes(MAX_HEADER_BYTES)
    }

    pub fn with_max_header_bytes(max_header_bytes: usize) -> Self {
        Self { max_header_bytes }
    }
}

impl Default for HeaderDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for HeaderDecoder {
    type Item = MessageHead;
    type Error = ParseError;

    /// Attempts to decode a message head from the provided bytes buffer.
    ///
    /// Returns `Ok(None)` while the head is still incomplete. Once it is complete the
    /// head bytes are split off `src`, leaving the body (if any) in place.
    ///
    /// # Errors
    ///
    /// - [`ParseError::TooLargeHeader`] if the head exceeds the limit, complete or not
    /// - [`ParseError::TooManyHeaders`] if there are more than 128 headers
    /// - [`ParseError::InvalidHeader`] if `httparse` rejects the header block
    /// - [`ParseError::InvalidContentLength`] if `Content-Length` is not a number
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let max = self.max_header_bytes;
        let partial = |len: usize| -> Result<Option<MessageHead>, ParseError> {
            ensure!(len <= max, ParseError::too_large_header(len, max));
            Ok(None)
        };

        let Some(line_end) = src.iter().position(|b| *b == b'\n') else {
            return partial(src.len());
        };

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let parsed = httparse::parse_headers(&src[line_end + 1..], &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e),
        })?;

        let (block_len, parsed_headers) = match parsed {
            Status::Complete(complete) => complete,
            Status::Partial => return partial(src.len()),
        };

        let head_len = line_end + 1 + block_len;
        trace!(head_size = head_len, header_count = parsed_headers.len(), "parsed message head");
        ensure!(head_len <= max, ParseError::too_large_header(head_len, max));

        let mut table = HeaderTable::with_capacity(parsed_headers.len() + 1);
        for header in parsed_headers {
            table.set(header.name, String::from_utf8_lossy(header.value), false);
        }

        let line = src[..line_end].strip_suffix(b"\r").unwrap_or(&src[..line_end]);
        let start_line = String::from_utf8_lossy(line).into_owned();

        let content_length = parse_content_length(&mut table)?;

        let _ = src.split_to(head_len);
        Ok(Some(MessageHead { start_line, headers: table, content_length }))
    }
}

/// Reads `Content-Length`, writing back an explicit `0` when it is missing.
fn parse_content_length(headers: &mut HeaderTable) -> Result<u64, ParseError> {
    match headers.get(CONTENT_LENGTH) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ParseError::invalid_content_length(format!("value {value} is not u64"))),
        None => {
            headers.set(CONTENT_LENGTH, "0", false);
            Ok(0)
        }
    }
}
