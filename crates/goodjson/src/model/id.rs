//! Document identifiers.
//!
//! Documents are keyed by 12-byte object ids: a 4-byte big-endian creation
//! timestamp (seconds), 5 random bytes and a 3-byte big-endian counter. On the
//! JSON side an id is always its 24-character lowercase hex string.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

/// Process-wide counter for the low three bytes of generated ids.
static COUNTER: AtomicU32 = AtomicU32::new(0);

/// A 12-byte document identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Wraps raw id bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Generates a fresh id from the current time, random bytes and a counter.
    pub fn new() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let random = uuid::Uuid::new_v4();
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00FF_FFFF;

        let mut id = [0u8; 12];
        id[0..4].copy_from_slice(&secs.to_be_bytes());
        id[4..9].copy_from_slice(&random.as_bytes()[..5]);
        id[9..12].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(id)
    }

    /// Derives a deterministic id from input bytes using SHA-256.
    ///
    /// ```text
    /// id = SHA-256(input_bytes)[0:12]
    /// ```
    ///
    /// Useful for fixtures: the same seed always names the same document.
    pub fn derived(input: &[u8]) -> Self {
        let hash = Sha256::digest(input);
        let mut id = [0u8; 12];
        id.copy_from_slice(&hash[..12]);
        Self(id)
    }

    /// Returns the raw id bytes.
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Returns the creation timestamp (seconds since Unix epoch) embedded in the id.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Formats the id as 24 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        format_object_id(self)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_object_id(s).ok_or_else(|| ParseObjectIdError { input: s.to_string() })
    }
}

/// Error returned when a string is not a 24-character hex object id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{input:?} is not a 24-character hex object id")]
pub struct ParseObjectIdError {
    pub input: String,
}

/// Formats an id as non-hyphenated lowercase hex.
pub fn format_object_id(id: &ObjectId) -> String {
    id.to_string()
}

/// Parses an id from a 24-character hex string (either case).
pub fn parse_object_id(s: &str) -> Option<ObjectId> {
    if s.len() != 24 || !s.is_ascii() {
        return None;
    }

    let mut id = [0u8; 12];
    for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
        let byte_str = std::str::from_utf8(chunk).ok()?;
        id[i] = u8::from_str_radix(byte_str, 16).ok()?;
    }
    Some(ObjectId(id))
}
