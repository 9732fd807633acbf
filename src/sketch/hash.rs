//! Representation hashing.
//!
//! Thomas Wang's 64-bit integer hash restricted to the low `2k` bits. Every
//! step is invertible modulo `2^(2k)`, so distinct k-mers never collide; only
//! the ordering used for minimizer selection changes.

use std::num::Wrapping;

use super::element::Representation;

/// Mask covering the `2k` bits of a k-mer encoding.
#[inline]
pub fn kmer_mask(kmer_size: usize) -> Representation {
    if kmer_size >= 32 {
        Representation::MAX
    } else {
        (1 << (2 * kmer_size)) - 1
    }
}

#[inline]
pub fn wang_hash64(key: Representation, mask: Representation) -> Representation {
    let m = Wrapping(mask);
    let mut key = Wrapping(key);
    key = ((!key) + (key << 21)) & m;
    key = key ^ (key >> 24);
    key = ((key + (key << 3)) + (key << 8)) & m;
    key = key ^ (key >> 14);
    key = ((key + (key << 2)) + (key << 4)) & m;
    key = key ^ (key >> 28);
    key = (key + (key << 31)) & m;
    key.0
}
