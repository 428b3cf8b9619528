use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::{MAX_HEADER_BYTES, MessageDecoder};
use crate::protocol::{Message, ParseError};

/// Default time a single read may wait for data
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

const INIT_BUFFER_SIZE: usize = 8 * 1024;

/// Reads whole [`Message`]s off a byte stream.
///
/// Every individual socket read is bounded by the idle timeout, so a peer that
/// trickles bytes keeps the message alive while a silent one is dropped.
#[derive(Debug)]
pub struct MessageReader<R> {
    reader: R,
    buffer: BytesMut,
    decoder: MessageDecoder,
    idle_timeout: Duration,
}

impl<R> MessageReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self::with_limits(reader, MAX_HEADER_BYTES, DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_limits(reader: R, max_header_bytes: usize, idle_timeout: Duration) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(INIT_BUFFER_SIZE),
            decoder: MessageDecoder::with_max_header_bytes(max_header_bytes),
            idle_timeout,
        }
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Receives the next complete message.
    ///
    /// # Errors
    ///
    /// - [`ParseError::Timeout`] if a read sees no data within the idle timeout
    /// - [`ParseError::ConnectionClosed`] if the peer closes before a message is complete
    /// - any framing error from [`MessageDecoder`]
    pub async fn receive(&mut self) -> Result<Message, ParseError> {
        loop {
            if let Some(message) = self.decoder.decode(&mut self.buffer)? {
                return Ok(message);
            }

            let read = tokio::time::timeout(self.idle_timeout, self.reader.read_buf(&mut self.buffer))
                .await
                .map_err(|_| ParseError::timeout(self.idle_timeout))??;
            trace!(read, buffered = self.buffer.len(), "read from stream");

            if read == 0 {
                return self.decoder.decode_eof(&mut self.buffer)?.ok_or(ParseError::ConnectionClosed);
            }
        }
    }
}
