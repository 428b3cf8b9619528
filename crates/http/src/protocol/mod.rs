//! HTTP/1.1 message model used on both sides of the proxy.
//!
//! - [`header`]: [`HeaderTable`], ordered and case-insensitive header storage
//! - [`message`]: [`Message`], a start line, headers and a fully buffered body
//! - [`request`]: [`Request`], the client's view of a message (method, host, path..)
//! - [`response`]: [`Response`], the origin's view (version, status, reason)
//! - [`error`]: [`HttpError`], [`ParseError`] and [`SendError`]
//!
//! Framing a message off the wire is the job of [`crate::codec`]; this module
//! only interprets what was framed.

mod header;
pub use header::HeaderIter;
pub use header::HeaderMatch;
pub use header::HeaderTable;

mod message;
pub use message::Message;
pub(crate) use message::CONTENT_LENGTH;

mod request;
pub use request::Request;
pub use request::Scheme;

mod response;
pub use response::Response;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
