//! Content hashing for chunk identity.

/// Hash a chunk's bytes to its content identity.
///
/// Returns the hex-encoded blake3 digest. The digest is used purely for
/// deduplication and change detection, never for security, but it must be
/// stable across runs and platforms so that incremental index runs recognize
/// previously indexed content.
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_for_identical_content() {
        assert_eq!(content_hash(b"fn foo() {}"), content_hash(b"fn foo() {}"));
    }

    #[test]
    fn distinct_for_distinct_content() {
        assert_ne!(content_hash(b"fn foo() {}"), content_hash(b"fn bar() {}"));
    }

    #[test]
    fn hex_encoded_blake3_width() {
        // 32-byte digest, two hex characters per byte.
        assert_eq!(content_hash(b"").len(), 64);
    }
}
