use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::header::HeaderEncoder;
use crate::protocol::{Message, SendError};

/// Serializes a whole [`Message`]: head as [`HeaderEncoder`] writes it, then the body.
///
/// Headers are written as held; callers that need a consistent `Content-Length`
/// call [`Message::sync_content_length`] first, as
/// [`MessageWriter`](crate::connection::MessageWriter) does.
#[derive(Debug)]
pub struct MessageEncoder;

impl<'a> Encoder<&'a Message> for MessageEncoder {
    type Error = SendError;

    fn encode(&mut self, item: &'a Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        HeaderEncoder.encode((item.start_line(), item.headers()), dst)?;

        dst.reserve(item.body().len());
        dst.put_slice(item.body());
        Ok(())
    }
}
