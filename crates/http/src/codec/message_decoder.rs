//! Streaming decoder that frames complete HTTP/1.1 messages.
//!
//! The decoder is a two-state machine: it first waits for a full head
//! ([`HeaderDecoder`]), then for `Content-Length` body bytes ([`LengthDecoder`]),
//! and yields one [`Message`] per pass. It works for requests and responses
//! alike.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use micro_proxy_http::codec::MessageDecoder;
//! use tokio_util::codec::Decoder;
//!
//! let mut buffer = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
//! let message = MessageDecoder::new().decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(&message.body()[..], b"hi");
//! ```

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::LengthDecoder;
use crate::codec::header::{HeaderDecoder, MessageHead};
use crate::protocol::{Message, ParseError};

#[derive(Debug)]
pub struct MessageDecoder {
    header_decoder: HeaderDecoder,
    body: Option<(MessageHead, LengthDecoder)>,
}

impl MessageDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// A decoder that accepts heads of up to `max_header_bytes` bytes.
    pub fn with_max_header_bytes(max_header_bytes: usize) -> Self {
        Self { header_decoder: HeaderDecoder::with_max_header_bytes(max_header_bytes), body: None }
    }

    /// Returns true when the decoder sits between messages.
    pub fn is_idle(&self) -> bool {
        self.body.is_none()
    }
}

impl Default for MessageDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder::new(), body: None }
    }
}

impl Decoder for MessageDecoder {
    type Item = Message;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.body.is_none() {
            match self.header_decoder.decode(src)? {
                Some(head) => {
                    let length_decoder = LengthDecoder::new(head.content_length);
                    self.body = Some((head, length_decoder));
                }
                None => return Ok(None),
            }
        }

        let Some((_, length_decoder)) = &mut self.body else {
            return Ok(None);
        };

        match length_decoder.decode(src)? {
            Some(body) => {
                let message = self.body.take().map(|(head, _)| Message::from_parts(head.start_line, head.headers, body));
                Ok(message)
            }
            None => Ok(None),
        }
    }

    /// Like [`decode`](Self::decode), but the stream has ended: a message that was
    /// started and not finished is [`ParseError::ConnectionClosed`].
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() && self.is_idle() => Ok(None),
            None => Err(ParseError::ConnectionClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn request_without_body() {
        let str = indoc! {r##"
        GET http://a.example/index.html HTTP/1.1
        Host: a.example
        Accept: */*

        "##};

        let mut buf = BytesMut::from(str);
        let message = MessageDecoder::new().decode(&mut buf).unwrap().unwrap();

        assert_eq!(message.start_line(), "GET http://a.example/index.html HTTP/1.1");
        assert_eq!(message.headers().get("Host"), Some("a.example"));
        assert_eq!(message.content_length(), 0);
        assert!(message.body().is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn response_with_body_arriving_in_pieces() {
        let mut decoder = MessageDecoder::new();
        let mut buf = BytesMut::new();

        buf.extend_from_slice(b"HTTP/1.1 200 OK\r\nContent-Le");
        assert!(decoder.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"ngth: 11\r\n\r\nhello");
        assert!(decoder.decode(&mut buf).unwrap().is_none());
        assert!(!decoder.is_idle());

        buf.extend_from_slice(b" world");
        let message = decoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(message.start_line(), "HTTP/1.1 200 OK");
        assert_eq!(&message.body()[..], b"hello world");
        assert!(decoder.is_idle());
    }

    #[test]
    fn bytes_after_the_body_are_left_alone() {
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nokGET / HTTP/1.1\r\n");

        let message = MessageDecoder::new().decode(&mut buf).unwrap().unwrap();

        assert_eq!(&message.body()[..], b"ok");
        assert_eq!(&buf[..], b"GET / HTTP/1.1\r\n");
    }

    #[test]
    fn eof_on_empty_buffer() {
        let mut buf = BytesMut::new();
        assert!(MessageDecoder::new().decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn eof_inside_head() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nHost: a");
        let result = MessageDecoder::new().decode_eof(&mut buf);
        assert!(matches!(result, Err(ParseError::ConnectionClosed)));
    }

    #[test]
    fn eof_inside_body() {
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc");
        let result = MessageDecoder::new().decode_eof(&mut buf);
        assert!(matches!(result, Err(ParseError::ConnectionClosed)));
    }

    #[test]
    fn header_limit_is_configurable() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nHost: a.example\r\n\r\n");
        let result = MessageDecoder::with_max_header_bytes(16).decode(&mut buf);
        assert!(matches!(result, Err(ParseError::TooLargeHeader { .. })));
    }
}
