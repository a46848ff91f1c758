//! Content hashing using blake3.
//!
//! - `content_hash` - full 64-char hex digest, used as a stable storage key
//! - `fingerprint` - 16-char prefix, used to tell module payloads apart in logs
//!
//! blake3 output is stable across builds and platforms, which matters here:
//! identity keys name files in the durable backup directory.

/// Compute the full hex digest of `data`.
#[inline]
pub fn content_hash<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    hex::encode(blake3::hash(data.as_ref()).as_bytes())
}

/// Compute a short hex fingerprint of `data`.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    let mut hash = content_hash(data);
    hash.truncate(16);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_deterministic() {
        assert_eq!(content_hash("print('hi')"), content_hash("print('hi')"));
        assert_ne!(content_hash("a"), content_hash("b"));
        assert_eq!(content_hash("a").len(), 64);
    }

    #[test]
    fn test_fingerprint_is_prefix() {
        let full = content_hash(b"module bytes");
        let short = fingerprint(b"module bytes");
        assert_eq!(short.len(), 16);
        assert!(full.starts_with(&short));
    }
}
