//! Typed word slices
//!
//! Bus payloads are carried as slices of their natural element type rather
//! than raw bytes, so a 16-bit word stays a `u16` until a driver decides how
//! it travels on the wire.

use core::ops::Range;

/// Borrowed, read-only slice of bus words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Words<'a> {
    /// 8-bit (or narrower) elements
    U8(&'a [u8]),
    /// 9..=16-bit elements
    U16(&'a [u16]),
    /// 17..=32-bit elements
    U32(&'a [u32]),
}

impl<'a> Words<'a> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(w) => w.len(),
            Self::U16(w) => w.len(),
            Self::U32(w) => w.len(),
        }
    }

    /// True if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of one element in memory, in bytes.
    pub const fn element_size(&self) -> usize {
        match self {
            Self::U8(_) => 1,
            Self::U16(_) => 2,
            Self::U32(_) => 4,
        }
    }

    /// Size of the whole slice in memory, in bytes.
    pub fn byte_len(&self) -> usize {
        self.len().saturating_mul(self.element_size())
    }

    /// Memory address of the first element.
    pub fn addr(&self) -> usize {
        match self {
            Self::U8(w) => w.as_ptr() as usize,
            Self::U16(w) => w.as_ptr() as usize,
            Self::U32(w) => w.as_ptr() as usize,
        }
    }

    /// Element `index` widened to `u32`.
    pub fn get(&self, index: usize) -> Option<u32> {
        match self {
            Self::U8(w) => w.get(index).map(|&v| u32::from(v)),
            Self::U16(w) => w.get(index).map(|&v| u32::from(v)),
            Self::U32(w) => w.get(index).copied(),
        }
    }

    /// Iterate over the elements widened to `u32`.
    pub fn iter(&self) -> impl Iterator<Item = u32> + 'a {
        let this = *self;
        (0..this.len()).filter_map(move |i| this.get(i))
    }

    /// Sub-slice by element range, `None` if out of bounds.
    pub fn slice(&self, range: Range<usize>) -> Option<Words<'a>> {
        Some(match *self {
            Self::U8(w) => Self::U8(w.get(range)?),
            Self::U16(w) => Self::U16(w.get(range)?),
            Self::U32(w) => Self::U32(w.get(range)?),
        })
    }

    /// Split at `mid` elements; `mid` is clamped to the length.
    pub fn split_at(&self, mid: usize) -> (Words<'a>, Words<'a>) {
        let mid = mid.min(self.len());
        match *self {
            Self::U8(w) => {
                let (a, b) = w.split_at(mid);
                (Self::U8(a), Self::U8(b))
            }
            Self::U16(w) => {
                let (a, b) = w.split_at(mid);
                (Self::U16(a), Self::U16(b))
            }
            Self::U32(w) => {
                let (a, b) = w.split_at(mid);
                (Self::U32(a), Self::U32(b))
            }
        }
    }
}

impl<'a> From<&'a [u8]> for Words<'a> {
    fn from(value: &'a [u8]) -> Self {
        Self::U8(value)
    }
}

impl<'a> From<&'a [u16]> for Words<'a> {
    fn from(value: &'a [u16]) -> Self {
        Self::U16(value)
    }
}

impl<'a> From<&'a [u32]> for Words<'a> {
    fn from(value: &'a [u32]) -> Self {
        Self::U32(value)
    }
}

/// Borrowed, writable slice of bus words (receive buffers).
#[derive(Debug, PartialEq, Eq)]
pub enum WordsMut<'a> {
    /// 8-bit (or narrower) elements
    U8(&'a mut [u8]),
    /// 9..=16-bit elements
    U16(&'a mut [u16]),
    /// 17..=32-bit elements
    U32(&'a mut [u32]),
}

impl<'a> WordsMut<'a> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(w) => w.len(),
            Self::U16(w) => w.len(),
            Self::U32(w) => w.len(),
        }
    }

    /// True if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of one element in memory, in bytes.
    pub const fn element_size(&self) -> usize {
        match self {
            Self::U8(_) => 1,
            Self::U16(_) => 2,
            Self::U32(_) => 4,
        }
    }

    /// Store `value` at `index`, truncated to the element type.
    ///
    /// Returns `false` if `index` is out of bounds.
    #[allow(clippy::cast_possible_truncation)] // truncation to the element type is the contract
    pub fn set(&mut self, index: usize, value: u32) -> bool {
        match self {
            Self::U8(w) => w.get_mut(index).map(|slot| *slot = value as u8).is_some(),
            Self::U16(w) => w.get_mut(index).map(|slot| *slot = value as u16).is_some(),
            Self::U32(w) => w.get_mut(index).map(|slot| *slot = value).is_some(),
        }
    }

    /// Reborrow for a shorter lifetime.
    pub fn reborrow(&mut self) -> WordsMut<'_> {
        match self {
            Self::U8(w) => WordsMut::U8(w),
            Self::U16(w) => WordsMut::U16(w),
            Self::U32(w) => WordsMut::U32(w),
        }
    }

    /// Read-only view of the same elements.
    pub fn as_words(&self) -> Words<'_> {
        match self {
            Self::U8(w) => Words::U8(w),
            Self::U16(w) => Words::U16(w),
            Self::U32(w) => Words::U32(w),
        }
    }
}

impl<'a> From<&'a mut [u8]> for WordsMut<'a> {
    fn from(value: &'a mut [u8]) -> Self {
        Self::U8(value)
    }
}

impl<'a> From<&'a mut [u16]> for WordsMut<'a> {
    fn from(value: &'a mut [u16]) -> Self {
        Self::U16(value)
    }
}

impl<'a> From<&'a mut [u32]> for WordsMut<'a> {
    fn from(value: &'a mut [u32]) -> Self {
        Self::U32(value)
    }
}
