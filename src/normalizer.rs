use crate::audio_bytes::canonical_sample;
use crate::error::{IngestError, Result};
use crate::format::FormatDescriptor;
use tracing::{trace, warn};

/// Converts raw interleaved PCM bytes into canonical `i32` samples.
///
/// The normalizer holds nothing but a copy of a frozen descriptor, so every
/// call is a pure function of its input and instances can be cloned freely
/// across threads.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    format: FormatDescriptor,
}

impl Normalizer {
    pub fn new(format: FormatDescriptor) -> Result<Self> {
        format.ensure_ready()?;
        Ok(Self { format })
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    /// Normalizes a whole buffer.
    ///
    /// A buffer that does not end on a frame boundary yields
    /// [`IngestError::TruncatedSample`] carrying every sample of the complete
    /// leading frames and the number of trailing bytes left over.
    pub fn normalize(&self, data: &[u8]) -> Result<Vec<i32>> {
        let mut samples = Vec::with_capacity(data.len() / self.format.bit_width().bytes());
        let remainder = self.normalize_into(data, &mut samples);

        if remainder != 0 {
            warn!(
                salvaged = samples.len(),
                remainder, "raw buffer does not end on a frame boundary"
            );
            return Err(IngestError::TruncatedSample {
                salvaged: samples,
                remainder,
            });
        }

        Ok(samples)
    }

    /// Appends the samples of every complete frame in `data` to `out` and
    /// returns the number of trailing bytes that were not consumed.
    pub fn normalize_into(&self, data: &[u8], out: &mut Vec<i32>) -> usize {
        let frame_len = self.format.bytes_per_frame();
        let sample_len = self.format.bit_width().bytes();
        let aligned = data.len() - data.len() % frame_len;

        let endianness = self.format.endianness();
        let signed = self.format.is_signed();
        let byte_swap = self.format.byte_swap();

        out.reserve(aligned / sample_len);
        data[..aligned].chunks_exact(sample_len).for_each(|chunk| {
            out.push(canonical_sample(chunk, endianness, signed, byte_swap));
        });

        trace!(
            bytes = data.len(),
            samples = aligned / sample_len,
            "normalized raw pcm"
        );

        data.len() - aligned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_types::{BitWidth, Endianness, InputFormat};
    use crate::test_utils::{encode_samples, raw_pcm_format};

    #[test]
    fn test_unknown_format_fails_fast() {
        let err = Normalizer::new(FormatDescriptor::new()).unwrap_err();
        assert!(matches!(err, IngestError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_empty_input() {
        let normalizer = Normalizer::new(raw_pcm_format(16, 2, true, Endianness::Little, false)).unwrap();
        assert_eq!(normalizer.normalize(&[]).unwrap(), Vec::<i32>::new());
        assert_eq!(normalizer.normalize(&[]).unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn test_unsigned_16_rebias() {
        let normalizer = Normalizer::new(raw_pcm_format(16, 1, false, Endianness::Little, false)).unwrap();
        let mut input = Vec::new();
        for raw in [0u16, 65535, 32768] {
            input.extend_from_slice(&raw.to_le_bytes());
        }
        assert_eq!(normalizer.normalize(&input).unwrap(), vec![-32768, 32767, 0]);
    }

    #[test]
    fn test_byte_swap_independent_of_endianness() {
        let plain = Normalizer::new(raw_pcm_format(16, 1, true, Endianness::Little, false)).unwrap();
        let swapped = Normalizer::new(raw_pcm_format(16, 1, true, Endianness::Little, true)).unwrap();
        assert_eq!(plain.normalize(&[0x01, 0x00]).unwrap(), vec![1]);
        assert_eq!(swapped.normalize(&[0x01, 0x00]).unwrap(), vec![256]);
    }

    #[test]
    fn test_big_endian_24() {
        let normalizer = Normalizer::new(raw_pcm_format(24, 2, true, Endianness::Big, false)).unwrap();
        let input = [0x7F, 0xFF, 0xFF, 0x80, 0x00, 0x00];
        assert_eq!(normalizer.normalize(&input).unwrap(), vec![8_388_607, -8_388_608]);
    }

    #[test]
    fn test_truncated_stereo_16() {
        let normalizer = Normalizer::new(raw_pcm_format(16, 2, true, Endianness::Little, false)).unwrap();
        let mut input = encode_samples(&[1, -1, 2, -2], normalizer.format());
        input.push(0x7F);

        let err = normalizer.normalize(&input).unwrap_err();
        assert!(err.is_recoverable());
        let (salvaged, remainder) = err.into_salvaged().unwrap();
        assert_eq!(salvaged, vec![1, -1, 2, -2]);
        assert_eq!(remainder, 1);
    }

    #[test]
    fn test_truncated_partial_frame_is_not_salvaged() {
        let normalizer = Normalizer::new(raw_pcm_format(16, 2, true, Endianness::Little, false)).unwrap();
        // one full frame plus the left sample of the next frame
        let input = encode_samples(&[10, 20, 30], normalizer.format());

        let (salvaged, remainder) = normalizer.normalize(&input).unwrap_err().into_salvaged().unwrap();
        assert_eq!(salvaged, vec![10, 20]);
        assert_eq!(remainder, 2);
    }

    #[test]
    fn test_truncation_does_not_poison_later_calls() {
        let normalizer = Normalizer::new(raw_pcm_format(16, 2, true, Endianness::Little, false)).unwrap();
        assert!(normalizer.normalize(&[0, 0, 0]).is_err());
        assert_eq!(normalizer.normalize(&[1, 0, 2, 0]).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_round_trip_all_layouts() {
        for bits in BitWidth::SUPPORTED {
            let min = -(1i64 << (bits - 1));
            let max = (1i64 << (bits - 1)) - 1;
            let values: Vec<i32> = [min, min + 1, -1, 0, 1, max / 3, max - 1, max]
                .iter()
                .map(|&v| v as i32)
                .collect();

            for endianness in [Endianness::Little, Endianness::Big] {
                for signed in [true, false] {
                    for byte_swap in [false, true] {
                        let format = raw_pcm_format(bits, 2, signed, endianness, byte_swap);
                        let normalizer = Normalizer::new(format).unwrap();
                        let bytes = encode_samples(&values, &format);
                        assert_eq!(
                            normalizer.normalize(&bytes).unwrap(),
                            values,
                            "bits={} endianness={:?} signed={} byte_swap={}",
                            bits,
                            endianness,
                            signed,
                            byte_swap
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_normalize_into_appends() {
        let format = raw_pcm_format(8, 1, false, Endianness::Little, false);
        let normalizer = Normalizer::new(format).unwrap();
        let mut out = vec![99];
        let remainder = normalizer.normalize_into(&[0x80, 0x81], &mut out);
        assert_eq!(remainder, 0);
        assert_eq!(out, vec![99, 0, 1]);
    }

    #[test]
    fn test_normalizer_accepts_compressed_kind() {
        let mut format = FormatDescriptor::new();
        format.set_detected_format(InputFormat::CompressedMp3).unwrap();
        assert!(Normalizer::new(format).is_ok());
    }
}
