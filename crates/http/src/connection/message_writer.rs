use bytes::BytesMut;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::codec::{HeaderEncoder, MessageEncoder};
use crate::protocol::{CONTENT_LENGTH, Message, SendError};

const INIT_BUFFER_SIZE: usize = 8 * 1024;

#[derive(Debug)]
pub struct MessageWriter<W> {
    writer: W,
    buffer: BytesMut,
}

impl<W> MessageWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, INIT_BUFFER_SIZE)
    }

    pub fn with_capacity(writer: W, buffer_size: usize) -> Self {
        Self { writer, buffer: BytesMut::with_capacity(buffer_size) }
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Sends `message`, first making its `Content-Length` match the body.
    ///
    /// Either every byte reaches the writer or an error is returned.
    pub async fn send(&mut self, message: &mut Message) -> Result<(), SendError> {
        message.sync_content_length();

        self.buffer.clear();
        MessageEncoder.encode(&*message, &mut self.buffer)?;
        self.flush().await
    }

    /// Sends the head of `message` followed by the whole of `file` as the body.
    ///
    /// The in-memory body of `message` is ignored and `Content-Length` is set to
    /// the file size. The file is read from its current position.
    pub async fn send_file(&mut self, message: &mut Message, file: &mut File) -> Result<(), SendError> {
        let size = file.metadata().await?.len();
        message.headers_mut().insert(CONTENT_LENGTH, size.to_string());

        self.buffer.clear();
        HeaderEncoder.encode((message.start_line(), message.headers()), &mut self.buffer)?;
        self.flush().await?;

        let copied = tokio::io::copy(file, &mut self.writer).await?;
        if copied != size {
            return Err(SendError::invalid_body(format!("file changed while sending, expected {size} bytes but sent {copied}")));
        }

        trace!(size, "sent file body");
        Ok(self.writer.flush().await?)
    }

    #[inline]
    async fn flush(&mut self) -> Result<(), SendError> {
        if !self.buffer.is_empty() {
            self.writer.write_all(self.buffer.as_ref()).await?;
            self.buffer.clear();
        }

        Ok(self.writer.flush().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MessageReader;
    use crate::protocol::HeaderTable;
    use std::io::SeekFrom;
    use tokio::io::AsyncSeekExt;

    #[tokio::test]
    async fn send_fixes_content_length() {
        let mut headers = HeaderTable::new();
        headers.insert("Content-Length", "100");
        headers.insert("Connection", "close");
        let mut message = Message::from_parts("HTTP/1.1 200 OK".to_string(), headers, "hello".into());

        let mut writer = MessageWriter::new(Vec::new());
        writer.send(&mut message).await.unwrap();

        let written = writer.into_inner();
        assert_eq!(&written[..], &b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello"[..]);
    }

    #[tokio::test]
    async fn sent_message_is_received_unchanged() {
        let mut headers = HeaderTable::new();
        headers.insert("X-Test", "v");
        headers.insert("Content-Length", "5");
        let mut message = Message::from_parts("HTTP/1.1 200 OK".to_string(), headers, "hello".into());

        let (client, server) = tokio::io::duplex(1024);
        let mut writer = MessageWriter::new(client);
        writer.send(&mut message).await.unwrap();
        drop(writer);

        let received = MessageReader::new(server).receive().await.unwrap();

        let pairs = |message: &Message| {
            let mut pairs: Vec<(String, String)> =
                message.headers().iter().map(|(name, value)| (name.to_string(), value.to_string())).collect();
            pairs.sort();
            pairs
        };
        assert_eq!(received.start_line(), "HTTP/1.1 200 OK");
        assert_eq!(pairs(&received), pairs(&message));
        assert_eq!(received.body().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn send_file_streams_the_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body");
        tokio::fs::write(&path, b"from disk").await.unwrap();

        let mut file = File::open(&path).await.unwrap();
        let mut message = Message::new("HTTP/1.1 200 OK");
        message.set_body("ignored");

        let mut writer = MessageWriter::new(Vec::new());
        writer.send_file(&mut message, &mut file).await.unwrap();

        let written = writer.into_inner();
        assert_eq!(&written[..], &b"HTTP/1.1 200 OK\r\nContent-Length: 9\r\n\r\nfrom disk"[..]);

        // a partially consumed file sends fewer bytes than its size
        file.seek(SeekFrom::Start(5)).await.unwrap();
        let mut writer = MessageWriter::new(Vec::new());
        let result = writer.send_file(&mut message, &mut file).await;
        assert!(matches!(result, Err(SendError::InvalidBody { .. })));
    }
}
