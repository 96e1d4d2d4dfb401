//! # Content Digest
//!
//! Defines `ContentDigest`, the 256-bit hash that names every stored
//! artifact. The digest is always rendered as 64 lowercase hex characters,
//! which is the form used in physical file names.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::MediaError;

/// A SHA-256 content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a digest from its raw 32 bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Access the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a digest from 64 hex characters (case-insensitive).
    pub fn from_hex(hex: &str) -> Result<Self, MediaError> {
        let hex = hex.trim();
        if hex.len() != 64 {
            return Err(MediaError::InvalidIdentity(format!(
                "digest must be 64 hex chars, got {} chars",
                hex.len()
            )));
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MediaError::InvalidIdentity(
                "digest contains non-hex characters".into(),
            ));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            bytes[i] = (nibble(chunk[0]) << 4) | nibble(chunk[1]);
        }
        Ok(Self { bytes })
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Caller guarantees `b` is an ASCII hex digit.
fn nibble(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

/// Compute the SHA-256 digest of a byte slice.
pub fn sha256_digest(data: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(bytes)
}
