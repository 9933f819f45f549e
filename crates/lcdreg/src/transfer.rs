//! Transfer descriptors
//!
//! A [`Transfer`] describes the data phase of one register access: which
//! phase the selector line signals, the borrowed payload, and the width each
//! element travels at. The element count is the payload length.

use platform::{bpw_mask, Words, WordsMut};

use crate::error::Error;

/// Command/data selector (D/C, RS or D/I depending on the controller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Selector {
    /// Register-select phase (selector line low)
    Command,
    /// Payload phase (selector line high)
    #[default]
    Data,
}

impl Selector {
    /// Line level for this phase.
    pub const fn is_data(self) -> bool {
        matches!(self, Self::Data)
    }
}

impl From<bool> for Selector {
    fn from(value: bool) -> Self {
        if value {
            Self::Data
        } else {
            Self::Command
        }
    }
}

/// Bits per element on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Width {
    /// 8-bit, `u8` elements
    Bits8,
    /// 9-bit command/data tagged, `u16` elements with the selector in bit 8
    Bits9,
    /// 16-bit, `u16` elements
    Bits16,
    /// 24-bit, `u32` elements (top byte ignored)
    Bits24,
    /// 32-bit, `u32` elements
    Bits32,
}

impl Width {
    /// Number of bits.
    pub const fn bits(self) -> u8 {
        match self {
            Self::Bits8 => 8,
            Self::Bits9 => 9,
            Self::Bits16 => 16,
            Self::Bits24 => 24,
            Self::Bits32 => 32,
        }
    }

    /// Memory taken by one element: 1, 2 or 4 bytes.
    pub const fn bytes_per_word(self) -> usize {
        match self.bits() {
            0..=8 => 1,
            9..=16 => 2,
            _ => 4,
        }
    }

    /// Parse a bit count.
    pub fn from_bits(bits: u8) -> Result<Self, Error> {
        match bits {
            8 => Ok(Self::Bits8),
            9 => Ok(Self::Bits9),
            16 => Ok(Self::Bits16),
            24 => Ok(Self::Bits24),
            32 => Ok(Self::Bits32),
            _ => Err(Error::InvalidArgument("unsupported width")),
        }
    }

    /// Check that `element_size` bytes is how this width is stored.
    pub fn check_element_size(self, element_size: usize) -> Result<(), Error> {
        if element_size == self.bytes_per_word() {
            Ok(())
        } else {
            Err(Error::InvalidArgument("element type does not match width"))
        }
    }
}

impl TryFrom<u8> for Width {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_bits(value)
    }
}

/// Set of widths a bus moves natively, bit `n-1` for `n`-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WidthMask(u32);

impl WidthMask {
    /// Plain 8-bit bus.
    pub const BITS8_ONLY: Self = Self(bpw_mask(8));

    /// Wrap a raw bits-per-word mask.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Mask with exactly `widths`.
    pub fn from_widths(widths: &[Width]) -> Self {
        Self(widths.iter().fold(0, |acc, w| acc | bpw_mask(w.bits())))
    }

    /// Raw mask.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether `width` is moved natively.
    pub const fn contains(self, width: Width) -> bool {
        self.0 & bpw_mask(width.bits()) != 0
    }
}

/// Data phase of a register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer<'a> {
    /// Selector level during the phase
    pub selector: Selector,
    /// Payload; the element type must match the width
    pub words: Words<'a>,
    /// Element width, `None` for the register default
    pub width: Option<Width>,
}

impl<'a> Transfer<'a> {
    /// Data-phase transfer at the default width.
    pub fn data(words: impl Into<Words<'a>>) -> Self {
        Self {
            selector: Selector::Data,
            words: words.into(),
            width: None,
        }
    }

    /// Set the element width.
    #[must_use]
    pub fn with_width(mut self, width: Width) -> Self {
        self.width = Some(width);
        self
    }

    /// Set the selector level.
    #[must_use]
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.words.len()
    }

    /// Width, falling back to `default`.
    pub fn width_or(&self, default: Width) -> Width {
        self.width.unwrap_or(default)
    }
}

/// Data phase of a register read.
#[derive(Debug)]
pub struct ReadTransfer<'a> {
    /// Selector level during the phase
    pub selector: Selector,
    /// Destination; the element type must match the width
    pub words: WordsMut<'a>,
    /// Element width, `None` for the register default
    pub width: Option<Width>,
}

impl<'a> ReadTransfer<'a> {
    /// Data-phase read at the default width.
    pub fn data(words: impl Into<WordsMut<'a>>) -> Self {
        Self {
            selector: Selector::Data,
            words: words.into(),
            width: None,
        }
    }

    /// Set the element width.
    #[must_use]
    pub fn with_width(mut self, width: Width) -> Self {
        self.width = Some(width);
        self
    }

    /// Set the selector level.
    #[must_use]
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.words.len()
    }

    /// Width, falling back to `default`.
    pub fn width_or(&self, default: Width) -> Width {
        self.width.unwrap_or(default)
    }
}

/// A register number stored the way its width travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegisterIndex {
    Byte([u8; 1]),
    Half([u16; 1]),
    Word([u32; 1]),
}

impl RegisterIndex {
    #[allow(clippy::cast_possible_truncation)] // register numbers are narrowed to the register width
    pub(crate) fn new(regnr: u32, width: Width) -> Self {
        match width.bytes_per_word() {
            1 => Self::Byte([regnr as u8]),
            2 => Self::Half([regnr as u16]),
            _ => Self::Word([regnr]),
        }
    }

    pub(crate) fn words(&self) -> Words<'_> {
        match self {
            Self::Byte(w) => Words::U8(w),
            Self::Half(w) => Words::U16(w),
            Self::Word(w) => Words::U32(w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_per_word_table() {
        assert_eq!(Width::Bits8.bytes_per_word(), 1);
        assert_eq!(Width::Bits9.bytes_per_word(), 2);
        assert_eq!(Width::Bits16.bytes_per_word(), 2);
        assert_eq!(Width::Bits24.bytes_per_word(), 4);
        assert_eq!(Width::Bits32.bytes_per_word(), 4);
    }

    #[test]
    fn width_parse_rejects_unknown() {
        assert_eq!(Width::try_from(16), Ok(Width::Bits16));
        assert!(Width::try_from(12).is_err());
        assert!(Width::try_from(0).is_err());
    }

    #[test]
    fn mask_membership() {
        let mask = WidthMask::from_widths(&[Width::Bits8, Width::Bits9]);
        assert!(mask.contains(Width::Bits8));
        assert!(mask.contains(Width::Bits9));
        assert!(!mask.contains(Width::Bits16));
        assert_eq!(mask.raw(), 0x180);
    }

    #[test]
    fn register_index_follows_width() {
        assert_eq!(
            RegisterIndex::new(0x1234, Width::Bits8).words(),
            Words::U8(&[0x34])
        );
        assert_eq!(
            RegisterIndex::new(0x1234, Width::Bits16).words(),
            Words::U16(&[0x1234])
        );
    }
}
