/// Test utilities for ingest tests
/// Provides raw PCM encoders and synthetic WAV / MPEG stream builders

use crate::audio_types::{Endianness, InputFormat};
use crate::format::FormatDescriptor;
use crate::mp3::Mp3FrameHeader;

/// Build a raw-PCM descriptor in one call
pub fn raw_pcm_format(
    bits: u8,
    channels: u8,
    signed: bool,
    endianness: Endianness,
    byte_swap: bool,
) -> FormatDescriptor {
    let mut format = FormatDescriptor::new();
    format.set_bit_width(bits).unwrap();
    format.set_channels(channels).unwrap();
    format.set_signed(signed);
    format.set_endianness(endianness);
    format.set_byte_swap(byte_swap);
    format.set_detected_format(InputFormat::RawPcm).unwrap();
    format
}

/// Encode canonical samples into the raw layout a descriptor expects.
/// Inverse of `Normalizer::normalize` for in-range values.
pub fn encode_samples(samples: &[i32], format: &FormatDescriptor) -> Vec<u8> {
    let width = format.bit_width().bytes();
    let bits = format.bit_width().bits() as u32;
    let mask = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };

    let mut bytes = Vec::with_capacity(samples.len() * width);
    for &sample in samples {
        let mut raw = sample as u32 & mask;
        if !format.is_signed() {
            raw ^= 1u32 << (bits - 1);
        }

        let mut unit = match format.endianness() {
            Endianness::Little => raw.to_le_bytes()[..width].to_vec(),
            Endianness::Big => raw.to_be_bytes()[4 - width..].to_vec(),
        };
        if format.byte_swap() {
            unit.reverse();
        }
        bytes.extend_from_slice(&unit);
    }
    bytes
}

/// Minimal canonical 44-byte WAV header followed by `data`
pub fn wav_bytes(format_tag: u16, channels: u16, sample_rate: u32, bits: u16, data: &[u8]) -> Vec<u8> {
    let fmt_chunk_size = 16u32;
    let data_chunk_size = data.len() as u32;
    let block_align = channels * (bits / 8);
    let byte_rate = sample_rate * block_align as u32;

    let mut buf = Vec::new();
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(4 + (8 + fmt_chunk_size) + (8 + data_chunk_size)).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&fmt_chunk_size.to_le_bytes());
    buf.extend_from_slice(&format_tag.to_le_bytes());
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits.to_le_bytes());
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_chunk_size.to_le_bytes());
    buf.extend_from_slice(data);
    buf
}

/// WAVE_FORMAT_EXTENSIBLE file whose SubFormat GUID starts with `sub_format`
pub fn wav_extensible_bytes(sub_format: u16, channels: u16, sample_rate: u32, bits: u16, data: &[u8]) -> Vec<u8> {
    let plain = wav_bytes(0xFFFE, channels, sample_rate, bits, data);
    let fmt_chunk_size = 40u32;

    let mut buf = Vec::new();
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(4 + (8 + fmt_chunk_size) + (8 + data.len() as u32)).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&fmt_chunk_size.to_le_bytes());
    buf.extend_from_slice(&plain[20..36]);
    buf.extend_from_slice(&22u16.to_le_bytes()); // cbSize
    buf.extend_from_slice(&bits.to_le_bytes()); // valid bits
    buf.extend_from_slice(&0u32.to_le_bytes()); // channel mask
    buf.extend_from_slice(&sub_format.to_le_bytes());
    // rest of the KSDATAFORMAT_SUBTYPE GUID
    buf.extend_from_slice(&[
        0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
    ]);
    buf.extend_from_slice(&plain[36..]);
    buf
}

/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, joint stereo, no CRC
pub const MPEG1_L3_128K_44100: [u8; 4] = [0xFF, 0xFB, 0x90, 0x44];

/// MPEG-2 Layer III, 64 kbps, 22.05 kHz, mono, no CRC
pub const MPEG2_L3_64K_22050_MONO: [u8; 4] = [0xFF, 0xF3, 0x80, 0xC4];

/// One zero-filled MPEG audio frame of the size its header declares
pub fn mpeg_frame(header: [u8; 4]) -> Vec<u8> {
    let parsed = Mp3FrameHeader::parse(&header).unwrap();
    let mut frame = vec![0u8; parsed.frame_size()];
    frame[..4].copy_from_slice(&header);
    frame
}

/// Set the padding bit of a frame header
pub fn with_padding(mut header: [u8; 4]) -> [u8; 4] {
    header[2] |= 0x02;
    header
}

/// ID3v2.4 tag with a synchsafe size and `payload_len` zero bytes
pub fn id3v2_tag(payload_len: u32, footer: bool) -> Vec<u8> {
    let flags = if footer { 0x10 } else { 0x00 };
    let mut tag = vec![b'I', b'D', b'3', 4, 0, flags];
    tag.push(((payload_len >> 21) & 0x7F) as u8);
    tag.push(((payload_len >> 14) & 0x7F) as u8);
    tag.push(((payload_len >> 7) & 0x7F) as u8);
    tag.push((payload_len & 0x7F) as u8);
    tag.extend(std::iter::repeat(0u8).take(payload_len as usize));
    if footer {
        tag.extend_from_slice(b"3DI");
        tag.extend_from_slice(&[4, 0, flags, 0, 0, 0, 0]);
    }
    tag
}

/// ID3v1 trailer block
pub fn id3v1_tag() -> Vec<u8> {
    let mut tag = vec![0u8; 128];
    tag[..3].copy_from_slice(b"TAG");
    tag
}
