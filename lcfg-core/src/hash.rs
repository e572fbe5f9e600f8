//! Bucket hashing for the open-addressed containers

/// 64-bit DJB hash (`h * 33 + byte`, seed 5381).
///
/// Both hash layers (component → resource list, set → component) use this
/// single function; insertion and lookup must agree on it.
pub fn djb_hash(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(5381u64, |h, b| h.wrapping_mul(33).wrapping_add(u64::from(*b)))
}

/// Reduce a name hash to a bucket index.
pub fn bucket_index(name: &str, buckets: usize) -> usize {
    (djb_hash(name.as_bytes()) % buckets as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_djb_hash_empty_is_seed() {
        assert_eq!(djb_hash(b""), 5381);
    }

    #[test]
    fn test_djb_hash_single_byte() {
        assert_eq!(djb_hash(b"a"), 5381 * 33 + b'a' as u64);
    }

    #[test]
    fn test_djb_hash_distinguishes_order() {
        assert_ne!(djb_hash(b"ab"), djb_hash(b"ba"));
    }

    #[test]
    fn test_bucket_index_in_range() {
        for name in ["sshd", "profile", "ng_prod", "x"] {
            assert!(bucket_index(name, 79) < 79);
        }
    }
}
