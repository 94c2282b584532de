//! Content fingerprinting used to key the call-graph cache.
//!
//! A fingerprint identifies file *content* for caching only; it carries no
//! security meaning.

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Chunk size used when streaming a file through the hasher (1 MiB).
pub const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// Fixed-length SHA-256 digest of a file's full content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContentFingerprint([u8; 32]);

impl ContentFingerprint {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form, used as the cache entry stem.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<ContentFingerprint> for String {
    fn from(fp: ContentFingerprint) -> Self {
        fp.to_hex()
    }
}

impl TryFrom<String> for ContentFingerprint {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        let bytes = hex::decode(&value).map_err(|e| format!("invalid fingerprint: {e}"))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "fingerprint must be 32 bytes".to_string())?;
        Ok(Self(arr))
    }
}

/// Streams `path` through SHA-256 in [`HASH_CHUNK_SIZE`] chunks.
///
/// Never holds more than one chunk in memory. Open and mid-stream read
/// failures are returned to the caller.
pub fn fingerprint_file(path: &Path) -> Result<ContentFingerprint> {
    let file = File::open(path)?;
    fingerprint_reader(file)
}

/// Streams any reader through SHA-256 in [`HASH_CHUNK_SIZE`] chunks.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> Result<ContentFingerprint> {
    let mut hasher = Sha256::new();
    let mut chunk = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&chunk[..n]);
    }
    Ok(ContentFingerprint(hasher.finalize().into()))
}
