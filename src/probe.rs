use crate::audio_types::{BitWidth, Endianness, InputFormat};
use crate::error::{IngestError, Result};
use crate::format::FormatDescriptor;
use crate::mp3::{id3v2_len, Mp3FrameHeader};
use crate::wav::WavHeader;
use tracing::debug;

/// Outcome of sniffing the first bytes of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub format: InputFormat,
    /// Offset of the first payload byte (PCM samples or the first MPEG frame).
    pub data_offset: usize,
    pub sampling_rate: Option<u32>,
}

/// Classifies an input by its leading magic bytes without touching any
/// descriptor.
pub fn sniff(header: &[u8]) -> InputFormat {
    if WavHeader::is_wav(header) {
        return InputFormat::RawPcm;
    }
    if header.starts_with(b"ID3") {
        return InputFormat::CompressedMp3;
    }
    if Mp3FrameHeader::is_sync(header) && Mp3FrameHeader::parse(header).is_ok() {
        return InputFormat::CompressedMp3;
    }
    if header.starts_with(b"fLaC") || header.starts_with(b"OggS") || header.starts_with(b"FORM") {
        return InputFormat::Other;
    }
    InputFormat::Unknown
}

/// Sniffs `header` and fills `desc` with whatever the container declares.
///
/// WAV input sets the full sample layout. MP3 input sets the channel count
/// and the 16-bit signed little-endian layout decoders emit. Unrecognised
/// input leaves `desc` untouched so a caller-declared raw layout survives.
pub fn probe(header: &[u8], desc: &mut FormatDescriptor) -> Result<ProbeReport> {
    let format = sniff(header);
    debug!(?format, bytes = header.len(), "probed input");

    match format {
        InputFormat::RawPcm => {
            let wav = WavHeader::parse(header)?.ok_or_else(|| {
                IngestError::Probe(format!(
                    "WAV header incomplete after {} bytes",
                    header.len()
                ))
            })?;
            wav.apply_to(desc)?;
            Ok(ProbeReport {
                format,
                data_offset: wav.data_offset(),
                sampling_rate: Some(wav.sampling_rate()),
            })
        }
        InputFormat::CompressedMp3 => {
            let offset = id3v2_len(header);
            let frame = header
                .get(offset..)
                .and_then(|rest| Mp3FrameHeader::parse(rest).ok());

            let mut next = *desc;
            if let Some(frame) = frame {
                next.set_channels(frame.channels())?;
            }
            next.set_bit_width(BitWidth::W16.bits())?;
            next.set_signed(true);
            next.set_endianness(Endianness::Little);
            next.set_detected_format(format)?;
            *desc = next;

            Ok(ProbeReport {
                format,
                data_offset: offset,
                sampling_rate: frame.map(|f| f.sample_rate()),
            })
        }
        InputFormat::Other => {
            desc.set_detected_format(format)?;
            Ok(ProbeReport {
                format,
                data_offset: 0,
                sampling_rate: None,
            })
        }
        InputFormat::Unknown => Ok(ProbeReport {
            format,
            data_offset: 0,
            sampling_rate: None,
        }),
    }
}
