//! Decoder for message bodies delimited by `Content-Length`, as defined in
//! [RFC 7230 Section 3.3.2](https://tools.ietf.org/html/rfc7230#section-3.3.2).

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::protocol::ParseError;

/// Upper bound for a single up-front reservation, so a huge declared length
/// doesn't allocate before the bytes actually arrive.
const MAX_RESERVE: u64 = 1024 * 1024;

/// Buffers a body of known length and yields it in one piece.
///
/// Bytes past the declared length stay in the source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    length: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }
}

impl Decoder for LengthDecoder {
    type Item = Bytes;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let available = src.len() as u64;
        if available < self.length {
            let missing = (self.length - available).min(MAX_RESERVE);
            src.reserve(missing as usize);
            return Ok(None);
        }

        Ok(Some(src.split_to(self.length as usize).freeze()))
    }
}
