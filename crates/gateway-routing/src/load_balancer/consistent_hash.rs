//! Deterministic key-to-slot hashing.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Map `key` onto `[0, size)` with 64-bit FNV-1a
///
/// The same key and size always give the same slot, across processes and
/// restarts. Returns `None` when `size` is zero.
#[must_use]
pub fn consistent_hash_index(key: &str, size: usize) -> Option<usize> {
    if size == 0 {
        return None;
    }
    Some((fnv1a_64(key.as_bytes()) % size as u64) as usize)
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}
