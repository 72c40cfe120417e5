//! Content identity for part dedup and change detection.

pub mod sha256;

pub use sha256::{sha256_hash_bytes, sha256_hash_chunks};
