//! Bit packing with a sentinel bit and zero padding.
//!
//! The encoded payload is rarely a whole number of bytes. Packing appends a
//! single `1` sentinel bit and then `padding` zero bits, where
//! `padding = 8 - (len + 1) % 8` lies in `1..=8`. Unpacking strips exactly
//! `padding + 1` trailing bits, so `unpack(pack(b)) == b` for every bit
//! sequence, including the empty one.
//!
//! Bits are grouped most-significant-bit first.

use crate::codec::Result;
use crate::error::Error;
use bitvec::prelude::*;

/// Logical bit sequence, MSB-first within each byte
pub type Bits = BitVec<u8, Msb0>;

/// Value of the end-of-data marker bit
pub const SENTINEL: bool = true;

/// Number of zero bits that follow the sentinel for a payload of `payload_bits`.
pub fn padding_for(payload_bits: usize) -> u8 {
    (8 - (payload_bits + 1) % 8) as u8
}

/// Appends the sentinel bit and zero padding in place.
///
/// # Returns
///
/// The padding length, in `1..=8`
pub fn seal(bits: &mut Bits) -> u8 {
    let padding = padding_for(bits.len());
    bits.push(SENTINEL);
    bits.resize(bits.len() + padding as usize, false);
    padding
}

/// Converts a byte-aligned run of bits into bytes.
///
/// `bits.len()` must be a multiple of 8; the slice itself may start at any bit
/// offset.
pub fn to_bytes(bits: &BitSlice<u8, Msb0>) -> Vec<u8> {
    debug_assert_eq!(bits.len() % 8, 0);
    bits.chunks_exact(8).map(|byte| byte.load_be::<u8>()).collect()
}

/// Expands bytes into their bits, MSB first.
pub fn expand(bytes: &[u8]) -> Bits {
    Bits::from_slice(bytes)
}

/// Packs a bit sequence into bytes.
///
/// # Returns
///
/// `(bytes, padding)` where `bytes.len() * 8 == bits.len() + 1 + padding`
pub fn pack(bits: &BitSlice<u8, Msb0>) -> (Vec<u8>, u8) {
    let mut sealed = bits.to_bitvec();
    let padding = seal(&mut sealed);
    (to_bytes(&sealed), padding)
}

/// Removes the padding and sentinel from a fully expanded bit sequence.
///
/// # Returns
///
/// `Error::CorruptArtifact` if the padding is outside `1..=8`, the sequence is
/// too short, a padding bit is set, or the sentinel bit is missing.
pub fn strip(mut bits: Bits, padding: u8) -> Result<Bits> {
    if !(1..=8).contains(&padding) {
        return Err(Error::corrupt(format!(
            "padding length {} outside 1..=8",
            padding
        )));
    }

    let trailer = padding as usize + 1;
    if bits.len() < trailer {
        return Err(Error::corrupt(format!(
            "payload has {} bits, fewer than the {} trailing sentinel and padding bits",
            bits.len(),
            trailer
        )));
    }

    let payload_len = bits.len() - trailer;
    if bits[payload_len] != SENTINEL {
        return Err(Error::corrupt("sentinel bit is not set"));
    }
    if bits[payload_len + 1..].any() {
        return Err(Error::corrupt("padding bits are not zero"));
    }

    bits.truncate(payload_len);
    Ok(bits)
}

/// Unpacks bytes produced by [`pack`] back into the original bit sequence.
pub fn unpack(bytes: &[u8], padding: u8) -> Result<Bits> {
    strip(expand(bytes), padding)
}
