use crate::audio_types::{Endianness, InputFormat};
use crate::error::{IngestError, Result};
use crate::format::FormatDescriptor;
use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

const WAVE_FORMAT_PCM: u16 = 0x0001;
const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const FMT_MIN_LEN: usize = 16;
// cbSize, valid bits, channel mask and the 16-byte SubFormat GUID
const FMT_EXTENSIBLE_LEN: usize = 40;
const SUB_FORMAT_OFFSET: usize = 24;

/// Layout of a RIFF/WAVE file up to the start of its `data` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    format_tag: u16,
    sub_format: Option<u16>,
    channel_count: u16,
    sampling_rate: u32,
    bits_per_sample: u16,
    data_offset: usize,
    data_len: usize,
}

impl WavHeader {
    pub fn is_wav(buf: &[u8]) -> bool {
        buf.len() >= RIFF_HEADER_LEN && &buf[..4] == b"RIFF" && &buf[8..12] == b"WAVE"
    }

    /// Walks the RIFF chunks in `buf`.
    ///
    /// Returns `Ok(None)` while `buf` ends before the `data` chunk header.
    pub fn parse(buf: &[u8]) -> Result<Option<WavHeader>> {
        if buf.len() < RIFF_HEADER_LEN {
            return Ok(None);
        }
        if !Self::is_wav(buf) {
            return Err(IngestError::Probe("Not a WAV file".to_string()));
        }

        let mut idx = RIFF_HEADER_LEN;
        let mut fmt: Option<(u16, Option<u16>, u16, u32, u16)> = None;

        loop {
            if buf.len() < idx + CHUNK_HEADER_LEN {
                return Ok(None);
            }
            let id = &buf[idx..idx + 4];
            let chunk_size = LittleEndian::read_u32(&buf[idx + 4..idx + 8]) as usize;
            let body = idx + CHUNK_HEADER_LEN;

            match id {
                b"fmt " => {
                    if chunk_size < FMT_MIN_LEN {
                        return Err(IngestError::Probe(format!(
                            "fmt chunk too small: {} bytes",
                            chunk_size
                        )));
                    }
                    if buf.len() < body + FMT_MIN_LEN {
                        return Ok(None);
                    }
                    let chunk = &buf[body..body + FMT_MIN_LEN];
                    let format_tag = LittleEndian::read_u16(&chunk[0..2]);
                    let sub_format = if format_tag == WAVE_FORMAT_EXTENSIBLE {
                        if chunk_size < FMT_EXTENSIBLE_LEN {
                            return Err(IngestError::Probe(format!(
                                "extensible fmt chunk too small: {} bytes",
                                chunk_size
                            )));
                        }
                        if buf.len() < body + FMT_EXTENSIBLE_LEN {
                            return Ok(None);
                        }
                        let guid = body + SUB_FORMAT_OFFSET;
                        Some(LittleEndian::read_u16(&buf[guid..guid + 2]))
                    } else {
                        None
                    };
                    fmt = Some((
                        format_tag,
                        sub_format,
                        LittleEndian::read_u16(&chunk[2..4]),
                        LittleEndian::read_u32(&chunk[4..8]),
                        LittleEndian::read_u16(&chunk[14..16]),
                    ));
                }
                b"data" => {
                    let (format_tag, sub_format, channel_count, sampling_rate, bits_per_sample) =
                        fmt.ok_or_else(|| {
                            IngestError::Probe("data chunk precedes fmt chunk".to_string())
                        })?;
                    return Ok(Some(WavHeader {
                        format_tag,
                        sub_format,
                        channel_count,
                        sampling_rate,
                        bits_per_sample,
                        data_offset: body,
                        data_len: chunk_size,
                    }));
                }
                _ => {}
            }

            // chunks are word aligned
            idx = body + chunk_size + (chunk_size & 1);
        }
    }

    pub fn format_tag(&self) -> u16 {
        self.format_tag
    }

    /// Leading code of the SubFormat GUID for `WAVE_FORMAT_EXTENSIBLE`.
    pub fn sub_format(&self) -> Option<u16> {
        self.sub_format
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    /// Offset of the first sample byte.
    pub fn data_offset(&self) -> usize {
        self.data_offset
    }

    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// Copies the sample layout into `desc` and marks it as raw PCM.
    ///
    /// WAV stores 8-bit samples unsigned and wider samples signed, always
    /// little-endian.
    pub fn apply_to(&self, desc: &mut FormatDescriptor) -> Result<()> {
        match self.sub_format.unwrap_or(self.format_tag) {
            WAVE_FORMAT_PCM => {}
            WAVE_FORMAT_IEEE_FLOAT => {
                return Err(IngestError::Probe(
                    "IEEE float WAV data is not integer PCM".to_string(),
                ))
            }
            other => {
                return Err(IngestError::Probe(format!(
                    "unsupported WAV format tag {:#06x}",
                    other
                )))
            }
        }

        let bits = u8::try_from(self.bits_per_sample).map_err(|_| {
            IngestError::InvalidConfiguration(format!(
                "unsupported bit width {}",
                self.bits_per_sample
            ))
        })?;
        let channels = u8::try_from(self.channel_count).map_err(|_| {
            IngestError::InvalidConfiguration(format!(
                "unsupported channel count {}",
                self.channel_count
            ))
        })?;

        let mut next = *desc;
        next.set_bit_width(bits)?;
        next.set_channels(channels)?;
        next.set_signed(bits > 8);
        next.set_endianness(Endianness::Little);
        next.set_detected_format(InputFormat::RawPcm)?;
        *desc = next;

        debug!(
            bits,
            channels,
            sampling_rate = self.sampling_rate,
            data_offset = self.data_offset,
            "wav header applied"
        );
        Ok(())
    }
}
