//! Packed presence bitmap helpers.
//!
//! Bit `i` lives in byte `i / 8` under mask `1 << (i % 8)`.

/// Check whether bit `bit_index` is set
pub fn get_bit(bitmap: &[u8], bit_index: usize) -> bool {
    let byte_idx = bit_index / 8;
    let bit_idx = bit_index % 8;
    if byte_idx >= bitmap.len() {
        return false;
    }
    (bitmap[byte_idx] & (1 << bit_idx)) != 0
}

/// Set or clear bit `bit_index` in place
pub fn set_bit(bitmap: &mut [u8], bit_index: usize, value: bool) {
    let byte_idx = bit_index / 8;
    let bit_idx = bit_index % 8;
    if value {
        bitmap[byte_idx] |= 1 << bit_idx;
    } else {
        bitmap[byte_idx] &= !(1 << bit_idx);
    }
}
