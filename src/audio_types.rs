use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    #[serde(alias = "le")]
    Little,
    #[serde(alias = "be")]
    Big,
}

/// Container classification set once by probing.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputFormat {
    #[default]
    Unknown,
    RawPcm,
    CompressedMp3,
    Other,
}

impl InputFormat {
    pub fn is_compressed(self) -> bool {
        matches!(self, InputFormat::CompressedMp3 | InputFormat::Other)
    }
}

/// Bits per raw sample. Only widths that map onto whole bytes are accepted.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BitWidth(u8);

impl BitWidth {
    pub const SUPPORTED: [u8; 4] = [8, 16, 24, 32];

    pub const W8: BitWidth = BitWidth(8);
    pub const W16: BitWidth = BitWidth(16);
    pub const W24: BitWidth = BitWidth(24);
    pub const W32: BitWidth = BitWidth(32);

    pub fn new(bits: u8) -> Result<Self> {
        if Self::SUPPORTED.contains(&bits) {
            Ok(BitWidth(bits))
        } else {
            Err(IngestError::InvalidConfiguration(format!(
                "unsupported bit width {}, expected one of {:?}",
                bits,
                Self::SUPPORTED
            )))
        }
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn bytes(self) -> usize {
        self.0 as usize / 8
    }
}

impl Default for BitWidth {
    fn default() -> Self {
        BitWidth::W16
    }
}

impl TryFrom<u8> for BitWidth {
    type Error = IngestError;

    fn try_from(bits: u8) -> Result<Self> {
        BitWidth::new(bits)
    }
}

impl From<BitWidth> for u8 {
    fn from(width: BitWidth) -> u8 {
        width.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_width_validation() {
        for bits in BitWidth::SUPPORTED {
            assert_eq!(BitWidth::new(bits).unwrap().bits(), bits);
        }
        for bits in [0u8, 1, 12, 20, 33, 64] {
            assert!(matches!(
                BitWidth::new(bits),
                Err(IngestError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_bit_width_bytes() {
        assert_eq!(BitWidth::W8.bytes(), 1);
        assert_eq!(BitWidth::W24.bytes(), 3);
        assert_eq!(BitWidth::W32.bytes(), 4);
    }
}
