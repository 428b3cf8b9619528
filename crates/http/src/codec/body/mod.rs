//! Body framing. Only `Content-Length` delimited bodies are supported; there is
//! no chunked transfer decoding.

mod length_decoder;

pub use length_decoder::LengthDecoder;
