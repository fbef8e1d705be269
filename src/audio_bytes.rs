use crate::audio_types::Endianness;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Reads a 1 to 4 byte unit as an unsigned integer.
pub(crate) fn read_unit(chunk: &[u8], endianness: Endianness) -> u32 {
    match endianness {
        Endianness::Little => LittleEndian::read_uint(chunk, chunk.len()) as u32,
        Endianness::Big => BigEndian::read_uint(chunk, chunk.len()) as u32,
    }
}

/// Reverses the bytes of one sample unit. Only the first `chunk.len()`
/// bytes of the result are meaningful.
pub(crate) fn swap_unit(chunk: &[u8]) -> [u8; 4] {
    let len = chunk.len();
    let mut unit = [0u8; 4];
    unit[..len].copy_from_slice(chunk);
    unit[..len].reverse();
    unit
}

/// Maps an offset-binary value onto two's complement of the same width.
///
/// Flipping the top bit is the same as subtracting `2^(bits-1)` modulo
/// `2^bits`, so it is exact for every width.
pub(crate) fn rebias_unsigned(raw: u32, bits: u8) -> u32 {
    raw ^ (1u32 << (bits - 1))
}

pub(crate) fn sign_extend(raw: u32, bits: u8) -> i32 {
    let shift = 32 - bits as u32;
    ((raw << shift) as i32) >> shift
}

/// Converts a single raw unit into a canonical sample.
///
/// `chunk` is one sample of a [`BitWidth`](crate::audio_types::BitWidth),
/// 1 to 4 bytes long.
pub(crate) fn canonical_sample(chunk: &[u8], endianness: Endianness, signed: bool, byte_swap: bool) -> i32 {
    let bits = (chunk.len() * 8) as u8;
    let raw = if byte_swap {
        let unit = swap_unit(chunk);
        read_unit(&unit[..chunk.len()], endianness)
    } else {
        read_unit(chunk, endianness)
    };
    let raw = if signed { raw } else { rebias_unsigned(raw, bits) };
    sign_extend(raw, bits)
}
