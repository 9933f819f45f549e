//! Video memory and line-range flush
//!
//! [`Framebuffer`] owns the pixels of one display in the element type its
//! format travels as, so a flush hands lcdreg a borrowed slice with no
//! conversion. Deciding *when* to flush belongs to the caller.

// Offsets are u64 products of u32 operands; line ranges are checked before
// subtraction.
#![allow(clippy::arithmetic_side_effects)]

use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use lcdreg::{Lcdreg, Transfer, Transport};
use platform::Words;

use crate::config::DisplayConfig;
use crate::error::Error;
use crate::format::PixelFormat;

/// Pixel storage by memory element.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Memory {
    Bytes(Vec<u8>),
    Halfwords(Vec<u16>),
    Words(Vec<u32>),
}

fn zeroed<T: Copy + Default>(len: usize) -> Result<Vec<T>, Error> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::OutOfMemory)?;
    buf.resize(len, T::default());
    Ok(buf)
}

/// Video memory for one display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    format: PixelFormat,
    xres: u32,
    yres: u32,
    line_length: u32,
    memory: Memory,
}

impl Framebuffer {
    /// Zeroed video memory for `config`.
    pub fn new(config: &DisplayConfig) -> Result<Self, Error> {
        config.validate()?;
        let format = config.format;
        let line_length = config.line_length();
        let bytes = usize::try_from(u64::from(line_length).saturating_mul(u64::from(config.yres())))
            .map_err(|_| Error::OutOfMemory)?;
        let memory = match format {
            PixelFormat::Mono01 | PixelFormat::Rgb888 => Memory::Bytes(zeroed(bytes)?),
            PixelFormat::Rgb565 => Memory::Halfwords(zeroed(bytes / 2)?),
            PixelFormat::Xrgb8888 => Memory::Words(zeroed(bytes / 4)?),
        };
        tracing::debug!(
            xres = config.xres(),
            yres = config.yres(),
            line_length,
            bytes,
            "fbdbi: video memory allocated"
        );
        Ok(Self {
            format,
            xres: config.xres(),
            yres: config.yres(),
            line_length,
            memory,
        })
    }

    /// Pixel format.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Visible width.
    pub fn xres(&self) -> u32 {
        self.xres
    }

    /// Visible height.
    pub fn yres(&self) -> u32 {
        self.yres
    }

    /// Bytes per line.
    pub fn line_length(&self) -> u32 {
        self.line_length
    }

    /// Byte storage (mono01, rgb888).
    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.memory {
            Memory::Bytes(buf) => Some(buf),
            _ => None,
        }
    }

    /// Halfword storage (rgb565).
    pub fn halfwords_mut(&mut self) -> Option<&mut [u16]> {
        match &mut self.memory {
            Memory::Halfwords(buf) => Some(buf),
            _ => None,
        }
    }

    /// Word storage (xrgb8888).
    pub fn words_mut(&mut self) -> Option<&mut [u32]> {
        match &mut self.memory {
            Memory::Words(buf) => Some(buf),
            _ => None,
        }
    }

    /// Set pixel (`x`, `y`) to `value`, truncated to the format.
    ///
    /// Mono01 stores pixel 0 of a byte in bit 0. Rgb888 `value` is
    /// `0x00RRGGBB`, stored blue first on little-endian hosts (red at bit
    /// offset 16 of a little-endian 24-bit load). Out-of-range coordinates
    /// are ignored.
    #[allow(clippy::cast_possible_truncation)] // values are truncated to the pixel format
    pub fn set_pixel(&mut self, x: u32, y: u32, value: u32) {
        if x >= self.xres || y >= self.yres {
            return;
        }
        let row = u64::from(y) * u64::from(self.line_length);
        let pixel = u64::from(x);
        match &mut self.memory {
            Memory::Bytes(buf) if self.format == PixelFormat::Mono01 => {
                let bit = 1u8 << (x % 8);
                if let Some(byte) = to_index(row + pixel / 8).and_then(|i| buf.get_mut(i)) {
                    if value & 1 == 0 {
                        *byte &= !bit;
                    } else {
                        *byte |= bit;
                    }
                }
            }
            Memory::Bytes(buf) => {
                let start = to_index(row + pixel * 3);
                if let Some(rgb) = start.and_then(|i| buf.get_mut(i..i.saturating_add(3))) {
                    let [_, r, g, b] = value.to_be_bytes();
                    if cfg!(target_endian = "little") {
                        rgb.copy_from_slice(&[b, g, r]);
                    } else {
                        rgb.copy_from_slice(&[r, g, b]);
                    }
                }
            }
            Memory::Halfwords(buf) => {
                if let Some(slot) = to_index(row / 2 + pixel).and_then(|i| buf.get_mut(i)) {
                    *slot = value as u16;
                }
            }
            Memory::Words(buf) => {
                if let Some(slot) = to_index(row / 4 + pixel).and_then(|i| buf.get_mut(i)) {
                    *slot = value;
                }
            }
        }
    }

    /// Set every memory element to `value`.
    #[allow(clippy::cast_possible_truncation)] // values are truncated to the element type
    pub fn fill(&mut self, value: u32) {
        match &mut self.memory {
            Memory::Bytes(buf) => buf.fill(value as u8),
            Memory::Halfwords(buf) => buf.fill(value as u16),
            Memory::Words(buf) => buf.fill(value),
        }
    }

    /// Memory elements of lines `ys..=ye`.
    pub fn lines(&self, ys: u32, ye: u32) -> Result<Words<'_>, Error> {
        if ys > ye || ye >= self.yres {
            return Err(Error::InvalidLineRange { ys, ye });
        }
        let per_line = u64::from(self.line_length / self.format.element_size());
        let lines = u64::from(ye - ys) + 1;
        let start = to_index(u64::from(ys) * per_line);
        let end = to_index((u64::from(ys) + lines) * per_line);
        let range = start.zip(end).map(|(s, e)| s..e);
        let words = match (&self.memory, range) {
            (Memory::Bytes(buf), Some(r)) => buf.get(r).map(Words::U8),
            (Memory::Halfwords(buf), Some(r)) => buf.get(r).map(Words::U16),
            (Memory::Words(buf), Some(r)) => buf.get(r).map(Words::U32),
            (_, None) => None,
        };
        words.ok_or(Error::InvalidLineRange { ys, ye })
    }

    /// Write lines `ys..=ye` to register `regnr` as a data phase.
    ///
    /// Mono01 sends `lines * line_length` bytes, rgb565 halfwords at 16
    /// bits, rgb888 bytes, xrgb8888 words at 24 bits. The caller sets up
    /// the controller's address window first and holds the register lock
    /// across both.
    pub fn update<T: Transport, D: DelayNs>(
        &self,
        reg: &mut Lcdreg<T, D>,
        regnr: u32,
        ys: u32,
        ye: u32,
    ) -> Result<(), Error> {
        let words = self.lines(ys, ye)?;
        tracing::trace!(regnr, ys, ye, count = words.len(), "fbdbi: update");
        let transfer = Transfer::data(words).with_width(self.format.transfer_width());
        reg.write(regnr, Some(&transfer))?;
        Ok(())
    }
}

fn to_index(value: u64) -> Option<usize> {
    usize::try_from(value).ok()
}
