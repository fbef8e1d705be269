use crate::audio_types::{BitWidth, Endianness, InputFormat};
use crate::error::{IngestError, Result};
use serde::Serialize;

pub const MAX_CHANNELS: u8 = 8;

/// Describes how raw input bytes are laid out.
///
/// A descriptor is mutated only while the input is being probed. Once an
/// [`InputSession`](crate::session::InputSession) begins normalization it
/// hands out copies and the pending descriptor can no longer change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatDescriptor {
    byte_swap: bool,
    signed: bool,
    endianness: Endianness,
    bit_width: BitWidth,
    channels: u8,
    detected_format: InputFormat,
}

impl Default for FormatDescriptor {
    fn default() -> Self {
        Self {
            byte_swap: false,
            signed: true,
            endianness: Endianness::Little,
            bit_width: BitWidth::W16,
            channels: 2,
            detected_format: InputFormat::Unknown,
        }
    }
}

impl FormatDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn byte_swap(&self) -> bool {
        self.byte_swap
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn bit_width(&self) -> BitWidth {
        self.bit_width
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn detected_format(&self) -> InputFormat {
        self.detected_format
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.bit_width.bytes() * self.channels as usize
    }

    pub fn set_byte_swap(&mut self, byte_swap: bool) {
        self.byte_swap = byte_swap;
    }

    pub fn set_signed(&mut self, signed: bool) {
        self.signed = signed;
    }

    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    pub fn set_bit_width(&mut self, bits: u8) -> Result<()> {
        self.bit_width = BitWidth::new(bits)?;
        Ok(())
    }

    pub fn set_channels(&mut self, channels: u8) -> Result<()> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(IngestError::InvalidConfiguration(format!(
                "channel count must be in 1..={}, got {}",
                MAX_CHANNELS, channels
            )));
        }
        self.channels = channels;
        Ok(())
    }

    /// One-way transition out of [`InputFormat::Unknown`].
    ///
    /// Declaring the kind already held is a no-op.
    pub fn set_detected_format(&mut self, kind: InputFormat) -> Result<()> {
        match (self.detected_format, kind) {
            (current, requested) if current == requested => Ok(()),
            (InputFormat::Unknown, requested) => {
                self.detected_format = requested;
                Ok(())
            }
            (current, requested) => Err(IngestError::IllegalStateTransition(format!(
                "input format already detected as {:?}, cannot redeclare as {:?}",
                current, requested
            ))),
        }
    }

    /// Checks the descriptor can drive a normalizer.
    pub fn ensure_ready(&self) -> Result<()> {
        if self.detected_format == InputFormat::Unknown {
            return Err(IngestError::InvalidConfiguration(
                "input format is unknown; refusing to guess sample layout".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let desc = FormatDescriptor::new();
        assert!(!desc.byte_swap());
        assert!(desc.is_signed());
        assert_eq!(desc.endianness(), Endianness::Little);
        assert_eq!(desc.bit_width(), BitWidth::W16);
        assert_eq!(desc.detected_format(), InputFormat::Unknown);
        assert_eq!(desc.bytes_per_frame(), 4);
    }

    #[test]
    fn test_set_bit_width_is_idempotent() {
        let mut desc = FormatDescriptor::new();
        desc.set_bit_width(24).unwrap();
        desc.set_bit_width(24).unwrap();
        assert_eq!(desc.bit_width().bits(), 24);
    }

    #[test]
    fn test_set_bit_width_rejects_unsupported() {
        let mut desc = FormatDescriptor::new();
        let err = desc.set_bit_width(12).unwrap_err();
        assert!(matches!(err, IngestError::InvalidConfiguration(_)));
        // a rejected width leaves the previous one in place
        assert_eq!(desc.bit_width(), BitWidth::W16);
    }

    #[test]
    fn test_set_channels_bounds() {
        let mut desc = FormatDescriptor::new();
        assert!(desc.set_channels(0).is_err());
        assert!(desc.set_channels(9).is_err());
        desc.set_channels(1).unwrap();
        assert_eq!(desc.bytes_per_frame(), 2);
    }

    #[test]
    fn test_detected_format_is_one_way() {
        let mut desc = FormatDescriptor::new();
        desc.set_detected_format(InputFormat::RawPcm).unwrap();
        desc.set_detected_format(InputFormat::RawPcm).unwrap();

        let err = desc
            .set_detected_format(InputFormat::CompressedMp3)
            .unwrap_err();
        assert!(matches!(err, IngestError::IllegalStateTransition(_)));

        let err = desc.set_detected_format(InputFormat::Unknown).unwrap_err();
        assert!(matches!(err, IngestError::IllegalStateTransition(_)));
        assert_eq!(desc.detected_format(), InputFormat::RawPcm);
    }

    #[test]
    fn test_ensure_ready_fails_fast_on_unknown() {
        let desc = FormatDescriptor::new();
        assert!(matches!(
            desc.ensure_ready(),
            Err(IngestError::InvalidConfiguration(_))
        ));
    }
}
