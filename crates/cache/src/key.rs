//! Cache keys: a request fingerprint and its 128-bit digest.

use std::fmt;

use xxhash_rust::xxh3::xxh3_128;

/// Identifies one cached response.
///
/// Equality is on the fingerprint string. The digest only picks the bucket and
/// the file name, so two fingerprints sharing a bucket are still told apart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheKey {
    fingerprint: Box<str>,
    digest: u128,
}

impl CacheKey {
    pub fn new(fingerprint: &str) -> Self {
        Self { fingerprint: fingerprint.into(), digest: xxh3_128(fingerprint.as_bytes()) }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn digest(&self) -> u128 {
        self.digest
    }

    /// The backing file name: the digest as 32 lowercase hex digits.
    pub fn file_name(&self) -> String {
        format!("{:032x}", self.digest)
    }

    /// Bucket index in a table of `buckets` buckets, taken from the top 32 bits.
    pub fn bucket(&self, buckets: usize) -> usize {
        let high = (self.digest >> 96) as u32;
        high as usize % buckets.max(1)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fingerprint)
    }
}
