//! Hashing helpers.
//!
//! SHA-256 is the only digest the node core uses: block identity, interlink
//! and body commitments, and transaction-root nodes.

use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of data
#[inline]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute SHA-256 over the concatenation of two inputs without allocating.
#[inline]
pub fn sha256_pair(left: &[u8], right: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_empty_input() {
        let digest = sha256(&[]);
        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_pair_matches_concatenation() {
        let joined = [b"left".as_slice(), b"right".as_slice()].concat();
        assert_eq!(sha256_pair(b"left", b"right"), sha256(&joined));
    }
}
