//! Peripheral abstraction layer
//!
//! SPI controller contract used by the register transports. Unlike
//! `embedded_hal::spi::SpiDevice`, a message here carries per-segment word
//! size, clock override and chip-select control, which LCD controllers with
//! 9-bit words and slow command latching need.

use crate::dma::{DmaHandle, DmaMapper};
use crate::words::{Words, WordsMut};

/// Bit in a bits-per-word mask for a word of `bits` bits (1..=32).
pub const fn bpw_mask(bits: u8) -> u32 {
    if bits == 0 || bits > 32 {
        0
    } else {
        1 << (bits - 1)
    }
}

/// One segment of an SPI message.
///
/// Words wider than 8 bits travel as their natural element type
/// (`Words::U16` for 9..=16, `Words::U32` for 17..=32).
#[derive(Debug)]
pub struct Segment<'a> {
    /// Data clocked out, if any
    pub tx: Option<Words<'a>>,
    /// Buffer filled with clocked-in data, if any
    pub rx: Option<WordsMut<'a>>,
    /// Word size on the wire
    pub bits_per_word: u8,
    /// Clock override for this segment
    pub speed_hz: Option<u32>,
    /// Keep chip-select asserted after the last segment of the message
    pub cs_change: bool,
    /// Mapping of `tx` when the controller should use DMA
    pub tx_dma: Option<DmaHandle>,
}

impl<'a> Segment<'a> {
    /// Transmit-only segment.
    pub fn write(tx: Words<'a>, bits_per_word: u8) -> Self {
        Self {
            tx: Some(tx),
            rx: None,
            bits_per_word,
            speed_hz: None,
            cs_change: false,
            tx_dma: None,
        }
    }

    /// Receive-only segment.
    pub fn read(rx: WordsMut<'a>, bits_per_word: u8) -> Self {
        Self {
            tx: None,
            rx: Some(rx),
            bits_per_word,
            speed_hz: None,
            cs_change: false,
            tx_dma: None,
        }
    }

    /// Override the clock for this segment.
    #[must_use]
    pub fn with_speed(mut self, speed_hz: Option<u32>) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Leave chip-select asserted once the message completes.
    #[must_use]
    pub fn with_cs_change(mut self) -> Self {
        self.cs_change = true;
        self
    }
}

/// SPI controller able to run multi-segment messages.
///
/// A message is framed by one chip-select assertion unless the last segment
/// sets `cs_change`.
pub trait SpiMaster: DmaMapper {
    /// Error type
    type Error: core::fmt::Debug;

    /// Supported word sizes, bit `n-1` set for `n`-bit words.
    ///
    /// Zero means the controller did not say; callers treat that as 8-bit only.
    fn bits_per_word_mask(&self) -> u32 {
        0
    }

    /// Highest clock the device may be driven at.
    fn max_speed_hz(&self) -> u32;

    /// Run one message, blocking until it completes.
    fn transfer(&mut self, message: &mut [Segment<'_>]) -> Result<(), Self::Error>;
}

impl<T: SpiMaster + ?Sized> SpiMaster for &mut T {
    type Error = T::Error;

    fn bits_per_word_mask(&self) -> u32 {
        T::bits_per_word_mask(self)
    }

    fn max_speed_hz(&self) -> u32 {
        T::max_speed_hz(self)
    }

    fn transfer(&mut self, message: &mut [Segment<'_>]) -> Result<(), Self::Error> {
        T::transfer(self, message)
    }
}

impl<T: DmaMapper + ?Sized> DmaMapper for &mut T {
    fn dma_capable(&self) -> bool {
        T::dma_capable(self)
    }

    fn map_to_device(&mut self, words: &Words<'_>) -> Result<DmaHandle, crate::dma::DmaError> {
        T::map_to_device(self, words)
    }

    fn unmap(&mut self, handle: DmaHandle) {
        T::unmap(self, handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bpw_mask_bits() {
        assert_eq!(bpw_mask(8), 0x80);
        assert_eq!(bpw_mask(9), 0x100);
        assert_eq!(bpw_mask(32), 0x8000_0000);
        assert_eq!(bpw_mask(0), 0);
        assert_eq!(bpw_mask(33), 0);
    }
}
