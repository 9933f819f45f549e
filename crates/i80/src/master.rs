//! Bus master contract

use platform::{Words, WordsMut};

/// The physical parallel controller at the root of an I80 bus.
///
/// Word slices passed to [`I80Master::write`] and [`I80Master::read`] use the
/// element type matching [`I80Master::data_width`]: `u32` above 16 bits,
/// `u16` above 8 bits, `u8` otherwise (see [`word_size_for`]).
pub trait I80Master {
    /// Error type
    type Error: core::fmt::Debug;

    /// Number of address lines.
    fn address_width(&self) -> u8;

    /// Number of data lines.
    fn data_width(&self) -> u8;

    /// Whether a read strobe is wired.
    fn readable(&self) -> bool;

    /// Whether a write strobe is wired.
    fn writable(&self) -> bool;

    /// Latch `address` on the address bus.
    fn set_address(&mut self, address: u32) -> Result<(), Self::Error>;

    /// Clock `words` out on the data bus.
    fn write(&mut self, words: Words<'_>) -> Result<(), Self::Error>;

    /// Clock `words.len()` elements in from the data bus.
    fn read(&mut self, words: WordsMut<'_>) -> Result<(), Self::Error>;
}

/// Memory size of one data-bus element for a bus `data_width` lines wide.
pub const fn word_size_for(data_width: u8) -> usize {
    if data_width > 16 {
        4
    } else if data_width > 8 {
        2
    } else {
        1
    }
}

impl<T: I80Master + ?Sized> I80Master for &mut T {
    type Error = T::Error;

    fn address_width(&self) -> u8 {
        T::address_width(self)
    }

    fn data_width(&self) -> u8 {
        T::data_width(self)
    }

    fn readable(&self) -> bool {
        T::readable(self)
    }

    fn writable(&self) -> bool {
        T::writable(self)
    }

    fn set_address(&mut self, address: u32) -> Result<(), Self::Error> {
        T::set_address(self, address)
    }

    fn write(&mut self, words: Words<'_>) -> Result<(), Self::Error> {
        T::write(self, words)
    }

    fn read(&mut self, words: WordsMut<'_>) -> Result<(), Self::Error> {
        T::read(self, words)
    }
}
