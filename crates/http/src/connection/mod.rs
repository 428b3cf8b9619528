//! Message framing over async byte streams.
//!
//! - [`MessageReader`]: receives complete messages, with an idle timeout per read
//! - [`MessageWriter`]: sends messages from memory, or a head followed by a file body
//!
//! Both sides of the proxy use these: the client connection and every origin
//! connection.

mod message_reader;
mod message_writer;

pub use message_reader::DEFAULT_IDLE_TIMEOUT;
pub use message_reader::MessageReader;
pub use message_writer::MessageWriter;
