//! Byte-level helpers shared by every place that needs a digest.

use crate::Hash;
use sha2::{Digest, Sha256};

/// Fixed-width big-endian encoding of a signed 64-bit integer.
pub fn int_to_bytes(n: i64) -> [u8; 8] {
    n.to_be_bytes()
}

pub fn sha256(data: &[u8]) -> Hash {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// Hash the concatenation of `parts` without building the joined buffer.
pub fn sha256_concat<'a, I>(parts: I) -> Hash
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// Length-prefix `bytes` with its length as an 8-byte big-endian integer.
pub(crate) fn put_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&int_to_bytes(bytes.len() as i64));
    buf.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_to_bytes_is_big_endian() {
        assert_eq!(int_to_bytes(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(int_to_bytes(256), [0, 0, 0, 0, 0, 0, 1, 0]);
        assert_eq!(int_to_bytes(-1), [0xFF; 8]);
    }

    #[test]
    fn sha256_known_vector() {
        let expected = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert_eq!(hex::encode(sha256(b"abc")), expected);
    }

    #[test]
    fn concat_matches_joined_buffer() {
        let joined = sha256(b"hello world");
        let parts: [&[u8]; 3] = [b"hello", b" ", b"world"];
        assert_eq!(sha256_concat(parts), joined);
    }

    #[test]
    fn empty_concat_is_hash_of_nothing() {
        let parts: [&[u8]; 0] = [];
        assert_eq!(sha256_concat(parts), sha256(b""));
    }

    #[test]
    fn prefixed_bytes_carry_length() {
        let mut buf = Vec::new();
        put_prefixed(&mut buf, b"ab");
        assert_eq!(buf, vec![0, 0, 0, 0, 0, 0, 0, 2, b'a', b'b']);
    }
}
