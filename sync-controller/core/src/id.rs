use sha2::{Digest, Sha256};

/// Derives a stable resource ID from a human-readable resource name.
///
/// The admin API only accepts IDs made of `[a-zA-Z0-9-_.]`, so the name is hashed and the leading
/// 8 bytes of the digest are hex-encoded.
pub fn derive(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    hex::encode(&digest[..8])
}
