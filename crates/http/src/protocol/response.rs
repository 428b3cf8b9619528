//! Response view over a framed [`Message`].

use http::StatusCode;

use crate::protocol::request::is_http_version;
use crate::protocol::{Message, ParseError};

const DEFAULT_VERSION: &str = "HTTP/1.1";

/// A response parsed out of a [`Message`], which it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    message: Message,
    version: String,
    status: StatusCode,
    reason: String,
}

impl Response {
    /// Parses `version SP status SP reason` from the start line.
    ///
    /// Origins in the wild drop either end of that line, so a missing version
    /// defaults to `HTTP/1.1` and a missing reason to an empty string. The status
    /// code itself is mandatory.
    pub fn parse(message: Message) -> Result<Response, ParseError> {
        let line = message.start_line().trim();
        let malformed = || ParseError::malformed_start_line(line);

        let (version, rest) = match line.split_once(' ') {
            Some((first, rest)) if is_http_version(first) => (first, rest.trim_start()),
            None if is_http_version(line) => return Err(malformed()),
            _ => (DEFAULT_VERSION, line),
        };

        let (code, reason) = match rest.split_once(' ') {
            Some((code, reason)) => (code, reason.trim()),
            None => (rest, ""),
        };

        let status = StatusCode::from_bytes(code.as_bytes()).map_err(|_| malformed())?;
        let version = version.to_string();
        let reason = reason.to_string();

        Ok(Response { message, version, status, reason })
    }

    /// The reply the proxy itself sends when it can't serve the request.
    ///
    /// The body is the reason phrase in plain text, and the connection is closed
    /// after it.
    pub fn error(status: StatusCode) -> Response {
        let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
        let mut message = Message::new(format!("{DEFAULT_VERSION} {} {reason}", status.as_u16()));
        message.headers_mut().insert("Content-Type", "text/plain");
        message.headers_mut().insert("Connection", "close");
        message.set_body(format!("{reason}\n"));

        Response { message, version: DEFAULT_VERSION.to_string(), status, reason }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }
}
