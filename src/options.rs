use crate::audio_types::{Endianness, InputFormat};
use crate::error::Result;
use crate::format::FormatDescriptor;
use serde::{Deserialize, Serialize};

/// Every input-layout option a caller can declare up front.
///
/// Options arrive from command-line or config parsing and are turned into a
/// validated [`FormatDescriptor`] exactly once per input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputOptions {
    pub swap_bytes: bool,
    pub signed: bool,
    pub endianness: Endianness,
    pub bit_width: u8,
    pub channels: u8,
    /// Declared container kind, e.g. raw PCM for headerless input.
    pub format: Option<InputFormat>,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            swap_bytes: false,
            signed: true,
            endianness: Endianness::Little,
            bit_width: 16,
            channels: 2,
            format: None,
        }
    }
}

impl InputOptions {
    pub fn raw_pcm() -> Self {
        Self {
            format: Some(InputFormat::RawPcm),
            ..Self::default()
        }
    }

    pub fn to_descriptor(&self) -> Result<FormatDescriptor> {
        let mut desc = FormatDescriptor::new();
        desc.set_byte_swap(self.swap_bytes);
        desc.set_signed(self.signed);
        desc.set_endianness(self.endianness);
        desc.set_bit_width(self.bit_width)?;
        desc.set_channels(self.channels)?;
        if let Some(format) = self.format {
            desc.set_detected_format(format)?;
        }
        Ok(desc)
    }
}
