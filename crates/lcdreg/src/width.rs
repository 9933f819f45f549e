//! Width adaptation
//!
//! Repacking of wide or tagged elements into bytes for buses that only move
//! 8-bit words. Every routine writes big-endian (most significant byte
//! first), the order LCD controllers latch multi-byte words in, and stops at
//! whichever of source and destination runs out first. The return value is
//! the number of bytes written.
//!
//! 9-bit words carry the command/data selector in bit 8. Without native
//! 9-bit support, groups of eight such words are packed as one 72-bit
//! big-endian bit stream (nine bytes), word 0 in the top bits.

// Counters are bounded by the destination length, and chunks_exact
// guarantees every indexed position exists.
#![allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]

use crate::error::Error;
use crate::transfer::{Selector, Width};

/// Bytes produced from one group of eight 9-bit words.
pub const NINE_BIT_GROUP_BYTES: usize = 9;

/// Words in one packed 9-bit group.
pub const NINE_BIT_GROUP_WORDS: usize = 8;

/// Selector bit of a 9-bit word.
pub const DC_BIT: u16 = 0x100;

/// 16-bit elements to big-endian byte pairs.
pub fn pack_be16(src: &[u16], dst: &mut [u8]) -> usize {
    let mut written = 0;
    for (word, out) in src.iter().zip(dst.chunks_exact_mut(2)) {
        out.copy_from_slice(&word.to_be_bytes());
        written += 2;
    }
    written
}

/// Big-endian byte pairs back to 16-bit elements.
pub fn unpack_be16(src: &[u8], dst: &mut [u16]) -> usize {
    let mut read = 0;
    for (pair, out) in src.chunks_exact(2).zip(dst.iter_mut()) {
        *out = u16::from_be_bytes([pair[0], pair[1]]);
        read += 2;
    }
    read
}

/// 24-bit elements (low three bytes of each `u32`) to big-endian triplets.
pub fn pack_be24(src: &[u32], dst: &mut [u8]) -> usize {
    let mut written = 0;
    for (word, out) in src.iter().zip(dst.chunks_exact_mut(3)) {
        let [_, hi, mid, lo] = word.to_be_bytes();
        out.copy_from_slice(&[hi, mid, lo]);
        written += 3;
    }
    written
}

/// 32-bit elements to big-endian quads.
pub fn pack_be32(src: &[u32], dst: &mut [u8]) -> usize {
    let mut written = 0;
    for (word, out) in src.iter().zip(dst.chunks_exact_mut(4)) {
        out.copy_from_slice(&word.to_be_bytes());
        written += 4;
    }
    written
}

/// Pack 9-bit words, eight at a time, into nine bytes each.
///
/// The word count must be a multiple of eight.
pub fn pack_9bit(src: &[u16], dst: &mut [u8]) -> Result<usize, Error> {
    if src.len() % NINE_BIT_GROUP_WORDS != 0 {
        return Err(Error::InvalidArgument(
            "9-bit emulation needs a multiple of 8 words",
        ));
    }
    let mut written = 0;
    for (group, out) in src
        .chunks_exact(NINE_BIT_GROUP_WORDS)
        .zip(dst.chunks_exact_mut(NINE_BIT_GROUP_BYTES))
    {
        let stream = group
            .iter()
            .fold(0u128, |acc, &word| (acc << 9) | u128::from(word & 0x1FF));
        let bytes = stream.to_be_bytes();
        out.copy_from_slice(&bytes[16 - NINE_BIT_GROUP_BYTES..]);
        written += NINE_BIT_GROUP_BYTES;
    }
    Ok(written)
}

/// Recover 9-bit words from packed groups; returns words written.
pub fn unpack_9bit(src: &[u8], dst: &mut [u16]) -> usize {
    let mut read = 0;
    for (group, out) in src
        .chunks_exact(NINE_BIT_GROUP_BYTES)
        .zip(dst.chunks_exact_mut(NINE_BIT_GROUP_WORDS))
    {
        let stream = group
            .iter()
            .fold(0u128, |acc, &byte| (acc << 8) | u128::from(byte));
        for (i, word) in out.iter_mut().enumerate() {
            let shift = 9 * (NINE_BIT_GROUP_WORDS - 1 - i);
            #[allow(clippy::cast_possible_truncation)] // masked to 9 bits
            let value = ((stream >> shift) & 0x1FF) as u16;
            *word = value;
        }
        read += NINE_BIT_GROUP_WORDS;
    }
    read
}

/// Zero words needed to round `count` up to a 9-bit group.
pub const fn nine_bit_padding(count: usize) -> usize {
    (NINE_BIT_GROUP_WORDS - count % NINE_BIT_GROUP_WORDS) % NINE_BIT_GROUP_WORDS
}

/// Selector bit for a tagged word.
pub const fn dc_bit(selector: Selector) -> u16 {
    if selector.is_data() {
        DC_BIT
    } else {
        0
    }
}

/// Tag bytes as 9-bit words.
pub fn tag_bytes(src: &[u8], selector: Selector, dst: &mut [u16]) -> usize {
    let tag = dc_bit(selector);
    let mut written = 0;
    for (byte, out) in src.iter().zip(dst.iter_mut()) {
        *out = u16::from(*byte) | tag;
        written += 1;
    }
    written
}

/// Tag 16-bit elements as pairs of 9-bit words, high byte first.
pub fn tag_halfwords(src: &[u16], selector: Selector, dst: &mut [u16]) -> usize {
    let tag = dc_bit(selector);
    let mut written = 0;
    for (half, out) in src.iter().zip(dst.chunks_exact_mut(2)) {
        let [hi, lo] = half.to_be_bytes();
        out.copy_from_slice(&[u16::from(hi) | tag, u16::from(lo) | tag]);
        written += 2;
    }
    written
}

/// Bus words carrying one element of `width` on a bus `bus_bits` wide.
///
/// Wider elements are split into whole bus words, so their width must be a
/// multiple of the bus width.
pub fn bus_words_per_element(width: Width, bus_bits: usize) -> Result<usize, Error> {
    let bits = usize::from(width.bits());
    if bus_bits == 0 {
        return Err(Error::InvalidArgument("bus has no data lines"));
    }
    if bits <= bus_bits {
        Ok(1)
    } else if bits % bus_bits == 0 {
        Ok(bits / bus_bits)
    } else {
        Err(Error::InvalidArgument("width is not a multiple of the bus width"))
    }
}

/// Bus word `index` of `value`, counting from the least significant.
pub fn bus_piece(value: u32, index: usize, bus_bits: usize) -> u32 {
    let shifted = u32::try_from(index * bus_bits)
        .ok()
        .and_then(|shift| value.checked_shr(shift))
        .unwrap_or(0);
    shifted & low_mask(bus_bits)
}

/// Shift `acc` up one bus word and append `piece`.
pub fn push_piece(acc: u32, piece: u32, bus_bits: usize) -> u32 {
    let shifted = u32::try_from(bus_bits)
        .ok()
        .and_then(|shift| acc.checked_shl(shift))
        .unwrap_or(0);
    shifted | (piece & low_mask(bus_bits))
}

fn low_mask(bits: usize) -> u32 {
    u32::try_from(bits)
        .ok()
        .and_then(|b| 1u32.checked_shl(b))
        .map_or(u32::MAX, |v| v - 1)
}
