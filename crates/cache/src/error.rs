use std::error::Error;
use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("resolver for {key} failed: {source}")]
    Resolve { key: String, source: Box<dyn Error + Send + Sync> },

    #[error("resolver for {key} returned without storing anything")]
    NotFilled { key: String },

    #[error("entry {key} is not being filled by the caller")]
    NotClaimed { key: String },
}

impl CacheError {
    pub fn resolve<K: ToString, E: Into<Box<dyn Error + Send + Sync>>>(key: K, e: E) -> Self {
        Self::Resolve { key: key.to_string(), source: e.into() }
    }

    pub fn not_filled<K: ToString>(key: K) -> Self {
        Self::NotFilled { key: key.to_string() }
    }

    pub fn not_claimed<K: ToString>(key: K) -> Self {
        Self::NotClaimed { key: key.to_string() }
    }
}
