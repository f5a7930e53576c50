//! Utility functions and helpers.

pub mod http;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `bytes`.
pub fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Standard base64 encoding used for mail attachments.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Length of the base64 encoding of `len` bytes, padding included.
pub fn base64_len(len: usize) -> usize {
    len.div_ceil(3) * 4
}
