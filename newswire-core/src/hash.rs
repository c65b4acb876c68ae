//! Content fingerprinting

use sha2::{Digest, Sha512};

/// Compute the SHA-512 hex fingerprint of serialized record text.
///
/// This is the deduplication key: two records with byte-identical canonical
/// text always map to the same hash, across calls and across process
/// restarts.
pub fn content_hash(data: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = content_hash("the wire, day 12");
        let b = content_hash("the wire, day 12");
        assert_eq!(a, b);
        // SHA-512 hex digest
        assert_eq!(a.len(), 128);
    }

    #[test]
    fn test_distinct_inputs_differ() {
        assert_ne!(content_hash("a"), content_hash("b"));
        assert_ne!(content_hash(""), content_hash(" "));
    }
}
