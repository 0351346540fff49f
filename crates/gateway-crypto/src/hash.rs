// hash.rs — SHA-256 hashing, the hash primitive used throughout the gateway:
// manifest hashes, request/result hashes, action hashes, and (via
// gateway-canon) interaction-record hashes all bottom out here.

use sha2::{Digest, Sha256};

/// Hash arbitrary bytes, returning a lowercase hex-encoded SHA-256 string.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_empty_vector() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn deterministic() {
        assert_eq!(sha256_hex(b"abc"), sha256_hex(b"abc"));
    }

    #[test]
    fn sensitive_to_input() {
        assert_ne!(sha256_hex(b"abc"), sha256_hex(b"abd"));
    }
}
