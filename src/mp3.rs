//! MPEG audio frame inspection.
//!
//! Nothing here decodes audio. Frames are only located and their 4-byte
//! headers parsed, so the session can report channel layout, bitrate and
//! frame counts for an MP3 input before (or while) an external decoder
//! turns it into PCM.

use crate::error::{IngestError, Result};
use crate::metadata::{StreamHeader, StreamMetadata};
use tracing::{debug, trace, warn};

const ID3V2_HEADER_LEN: usize = 10;
const ID3V1_TAG_LEN: usize = 128;

// kbps, indexed by the 4-bit bitrate index; index 0 is free format
const BITRATES_V1_L1: [u32; 15] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448];
const BITRATES_V1_L2: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384];
const BITRATES_V1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const BITRATES_V2_L1: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
const BITRATES_V2_L23: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    V1,
    V2,
    V2_5,
}

impl MpegVersion {
    fn sample_rates(self) -> [u32; 3] {
        match self {
            MpegVersion::V1 => [44_100, 48_000, 32_000],
            MpegVersion::V2 => [22_050, 24_000, 16_000],
            MpegVersion::V2_5 => [11_025, 12_000, 8_000],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    SingleChannel,
}

impl ChannelMode {
    pub fn channels(self) -> u8 {
        match self {
            ChannelMode::SingleChannel => 1,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mp3FrameHeader {
    version: MpegVersion,
    layer: u8,
    protected: bool,
    bitrate_kbps: u32,
    sample_rate: u32,
    padding: bool,
    channel_mode: ChannelMode,
}

impl Mp3FrameHeader {
    /// True when `bytes` starts with the 11-bit frame sync.
    pub fn is_sync(bytes: &[u8]) -> bool {
        bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(IngestError::Probe(format!(
                "MPEG frame header needs 4 bytes, got {}",
                bytes.len()
            )));
        }
        if !Self::is_sync(bytes) {
            return Err(IngestError::Probe("missing MPEG frame sync".to_string()));
        }

        let (b1, b2, b3) = (bytes[1], bytes[2], bytes[3]);

        let version = match (b1 >> 3) & 0x03 {
            0b00 => MpegVersion::V2_5,
            0b10 => MpegVersion::V2,
            0b11 => MpegVersion::V1,
            _ => return Err(IngestError::Probe("reserved MPEG version".to_string())),
        };

        let layer = match (b1 >> 1) & 0x03 {
            0b01 => 3,
            0b10 => 2,
            0b11 => 1,
            _ => return Err(IngestError::Probe("reserved MPEG layer".to_string())),
        };

        let bitrate_index = ((b2 >> 4) & 0x0F) as usize;
        if bitrate_index == 0x0F {
            return Err(IngestError::Probe("invalid bitrate index".to_string()));
        }
        let table = match (version, layer) {
            (MpegVersion::V1, 1) => &BITRATES_V1_L1,
            (MpegVersion::V1, 2) => &BITRATES_V1_L2,
            (MpegVersion::V1, _) => &BITRATES_V1_L3,
            (_, 1) => &BITRATES_V2_L1,
            _ => &BITRATES_V2_L23,
        };

        let sample_rate_index = ((b2 >> 2) & 0x03) as usize;
        if sample_rate_index == 0x03 {
            return Err(IngestError::Probe("reserved sample rate index".to_string()));
        }

        let channel_mode = match (b3 >> 6) & 0x03 {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            _ => ChannelMode::SingleChannel,
        };

        Ok(Self {
            version,
            layer,
            protected: b1 & 0x01 == 0,
            bitrate_kbps: table[bitrate_index],
            sample_rate: version.sample_rates()[sample_rate_index],
            padding: (b2 >> 1) & 0x01 == 1,
            channel_mode,
        })
    }

    pub fn version(&self) -> MpegVersion {
        self.version
    }

    pub fn layer(&self) -> u8 {
        self.layer
    }

    /// CRC-16 follows the header.
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// 0 for free-format streams.
    pub fn bitrate_kbps(&self) -> u32 {
        self.bitrate_kbps
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn has_padding(&self) -> bool {
        self.padding
    }

    pub fn channel_mode(&self) -> ChannelMode {
        self.channel_mode
    }

    pub fn channels(&self) -> u8 {
        self.channel_mode.channels()
    }

    pub fn samples_per_frame(&self) -> u32 {
        match (self.layer, self.version) {
            (1, _) => 384,
            (2, _) => 1152,
            (_, MpegVersion::V1) => 1152,
            _ => 576,
        }
    }

    /// Frame length in bytes, header included. Free-format frames report 0
    /// because their length cannot be derived from the header.
    pub fn frame_size(&self) -> usize {
        let bitrate = self.bitrate_kbps as usize * 1000;
        let rate = self.sample_rate as usize;
        let padding = self.padding as usize;
        if self.layer == 1 {
            (12 * bitrate / rate + padding) * 4
        } else {
            self.samples_per_frame() as usize / 8 * bitrate / rate + padding
        }
    }

    pub fn duration_micros(&self) -> u64 {
        self.samples_per_frame() as u64 * 1_000_000 / self.sample_rate as u64
    }

    pub fn stream_header(&self) -> StreamHeader {
        StreamHeader::new(
            self.channels(),
            self.sample_rate,
            self.bitrate_kbps,
            self.frame_size() as u32,
        )
        .with_samples_per_frame(self.samples_per_frame())
    }

    fn same_stream(&self, other: &Mp3FrameHeader) -> bool {
        self.version == other.version
            && self.layer == other.layer
            && self.sample_rate == other.sample_rate
    }
}

/// Total length of a leading ID3v2 tag (header, body and footer), or 0.
pub fn id3v2_len(data: &[u8]) -> usize {
    if data.len() < ID3V2_HEADER_LEN || &data[..3] != b"ID3" {
        return 0;
    }
    let flags = data[5];
    let size = &data[6..10];
    if size.iter().any(|b| b & 0x80 != 0) {
        return 0;
    }
    let body = size
        .iter()
        .fold(0usize, |acc, &b| (acc << 7) | (b & 0x7F) as usize);
    let footer = if flags & 0x10 != 0 { ID3V2_HEADER_LEN } else { 0 };
    ID3V2_HEADER_LEN + body + footer
}

/// Duration estimate for constant-bitrate streams from payload size alone.
pub fn estimate_cbr_duration_micros(bitrate_kbps: u32, payload_len: u64) -> Option<u64> {
    if bitrate_kbps == 0 {
        return None;
    }
    let bytes_per_second = bitrate_kbps as u64 * 1000 / 8;
    Some(payload_len * 1_000_000 / bytes_per_second)
}

/// Walks MPEG frames across successive buffers, feeding a
/// [`StreamMetadata`] as it goes.
#[derive(Debug, Default)]
pub struct Mp3Scanner {
    first: Option<Mp3FrameHeader>,
    frames: u64,
    duration_micros: u64,
    skipped_bytes: u64,
    tag_pending: usize,
    started: bool,
}

impl Mp3Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_header(&self) -> Option<&Mp3FrameHeader> {
        self.first.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Exact duration of every frame seen so far.
    pub fn duration_micros(&self) -> u64 {
        self.duration_micros
    }

    /// Bytes dropped while hunting for frame sync.
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped_bytes
    }

    /// Scans `data` and returns how many leading bytes were consumed.
    ///
    /// A frame that straddles the end of `data` is left unconsumed; the
    /// caller prepends those bytes to its next buffer.
    pub fn feed(&mut self, data: &[u8], metadata: &StreamMetadata) -> usize {
        let mut pos = self.tag_pending.min(data.len());
        self.tag_pending -= pos;

        if !self.started && self.tag_pending == 0 {
            if data.len() < ID3V2_HEADER_LEN && data.starts_with(&b"ID3"[..data.len().min(3)]) {
                return 0;
            }
            self.started = true;
            let tag = id3v2_len(&data[pos..]);
            if tag > 0 {
                debug!(len = tag, "skipping ID3v2 tag");
                let take = tag.min(data.len() - pos);
                self.tag_pending = tag - take;
                pos += take;
            }
        }

        while pos + 4 <= data.len() {
            let window = &data[pos..];

            if Mp3FrameHeader::is_sync(window) {
                if let Ok(header) = Mp3FrameHeader::parse(window) {
                    let size = header.frame_size();
                    let consistent = self.first.map_or(true, |first| first.same_stream(&header));
                    if size > 4 && consistent {
                        if pos + size > data.len() {
                            break;
                        }
                        self.on_frame(header, metadata);
                        pos += size;
                        continue;
                    }
                }
            }

            if window.starts_with(b"TAG") {
                if pos + ID3V1_TAG_LEN > data.len() {
                    break;
                }
                trace!("skipping ID3v1 tag");
                pos += ID3V1_TAG_LEN;
                continue;
            }

            if self.skipped_bytes == 0 {
                warn!(offset = pos, "lost MPEG frame sync, resynchronising");
            }
            self.skipped_bytes += 1;
            pos += 1;
        }

        pos
    }

    fn on_frame(&mut self, header: Mp3FrameHeader, metadata: &StreamMetadata) {
        match self.first {
            None => {
                metadata.observe_header(header.stream_header());
                self.first = Some(header);
            }
            Some(first) if first.bitrate_kbps != header.bitrate_kbps => {
                metadata.mark_variable_bitrate();
            }
            Some(_) => {}
        }

        self.frames += 1;
        self.duration_micros += header.duration_micros();
        let total = metadata.increment_frame_count();
        trace!(frame = total, size = header.frame_size(), "mpeg frame");
    }
}
