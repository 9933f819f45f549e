//! Lazily allocated repacking buffers.

use alloc::vec::Vec;

use crate::error::Error;

/// Conventional page size; transports size their scratch and segments by it.
pub const PAGE_SIZE: usize = 4096;

/// A buffer allocated on first use and kept for the owner's lifetime.
#[derive(Debug, Default)]
pub(crate) struct Scratch<T> {
    buf: Vec<T>,
}

impl<T: Copy + Default> Scratch<T> {
    pub(crate) const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// At least `len` elements, allocating on first use.
    pub(crate) fn get(&mut self, len: usize) -> Result<&mut [T], Error> {
        if self.buf.len() < len {
            let extra = len.saturating_sub(self.buf.len());
            self.buf.try_reserve_exact(extra).map_err(|_| {
                tracing::warn!(len, "lcdreg: scratch allocation failed");
                Error::ResourceExhausted
            })?;
            self.buf.resize(len, T::default());
        }
        self.buf.get_mut(..len).ok_or(Error::ResourceExhausted)
    }

    #[cfg(test)]
    pub(crate) fn is_allocated(&self) -> bool {
        !self.buf.is_empty()
    }
}

/// A zeroed vector of `len` elements, or `ResourceExhausted`.
pub(crate) fn zeroed<T: Copy + Default>(len: usize) -> Result<Vec<T>, Error> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::ResourceExhausted)?;
    buf.resize(len, T::default());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_once() {
        let mut scratch: Scratch<u8> = Scratch::new();
        assert!(!scratch.is_allocated());
        assert_eq!(scratch.get(16).unwrap().len(), 16);
        assert_eq!(scratch.get(8).unwrap().len(), 8);
        assert!(scratch.is_allocated());
    }
}
