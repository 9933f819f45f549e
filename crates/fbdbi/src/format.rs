//! Pixel formats
//!
//! | Format     | bpp | Line length   | Wire width | Memory element |
//! |------------|-----|---------------|------------|----------------|
//! | `mono01`   | 1   | `xres / 8`    | 8          | `u8`           |
//! | `rgb565`   | 16  | `xres * 2`    | 16         | `u16`          |
//! | `rgb888`   | 24  | `xres * 3`    | 8          | `u8`           |
//! | `xrgb8888` | 32  | `xres * 4`    | 24         | `u32`          |

use core::fmt;
use core::str::FromStr;

use lcdreg::Width;

use crate::error::ConfigError;

/// Layout of one pixel in video memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PixelFormat {
    /// 1 bit per pixel, eight pixels per byte
    Mono01,
    /// 5-6-5 red/green/blue in a halfword
    #[default]
    Rgb565,
    /// 8-8-8 red/green/blue, three bytes per pixel
    Rgb888,
    /// 8-8-8 red/green/blue in the low three bytes of a word
    Xrgb8888,
}

impl PixelFormat {
    /// Bits per pixel in video memory.
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Mono01 => 1,
            Self::Rgb565 => 16,
            Self::Rgb888 => 24,
            Self::Xrgb8888 => 32,
        }
    }

    /// Bytes in one line of `xres` pixels.
    pub const fn line_length(self, xres: u32) -> u32 {
        match self {
            Self::Mono01 => xres / 8,
            Self::Rgb565 => xres.saturating_mul(2),
            Self::Rgb888 => xres.saturating_mul(3),
            Self::Xrgb8888 => xres.saturating_mul(4),
        }
    }

    /// Width the pixels travel at.
    pub const fn transfer_width(self) -> Width {
        match self {
            Self::Mono01 | Self::Rgb888 => Width::Bits8,
            Self::Rgb565 => Width::Bits16,
            Self::Xrgb8888 => Width::Bits24,
        }
    }

    /// Bytes per memory element.
    pub const fn element_size(self) -> u32 {
        match self {
            Self::Mono01 | Self::Rgb888 => 1,
            Self::Rgb565 => 2,
            Self::Xrgb8888 => 4,
        }
    }

    /// Property string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mono01 => "mono01",
            Self::Rgb565 => "rgb565",
            Self::Rgb888 => "rgb888",
            Self::Xrgb8888 => "xrgb8888",
        }
    }
}

impl FromStr for PixelFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mono01" => Ok(Self::Mono01),
            "rgb565" => Ok(Self::Rgb565),
            "rgb888" => Ok(Self::Rgb888),
            "xrgb8888" => Ok(Self::Xrgb8888),
            _ => Err(ConfigError::UnknownFormat),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_lengths() {
        assert_eq!(PixelFormat::Mono01.line_length(128), 16);
        assert_eq!(PixelFormat::Rgb565.line_length(320), 640);
        assert_eq!(PixelFormat::Rgb888.line_length(320), 960);
        assert_eq!(PixelFormat::Xrgb8888.line_length(320), 1280);
    }

    #[test]
    fn parse_round_trips_names() {
        for format in [
            PixelFormat::Mono01,
            PixelFormat::Rgb565,
            PixelFormat::Rgb888,
            PixelFormat::Xrgb8888,
        ] {
            assert_eq!(format.as_str().parse::<PixelFormat>(), Ok(format));
        }
        assert_eq!("rgb666".parse::<PixelFormat>(), Err(ConfigError::UnknownFormat));
    }

    #[test]
    fn wire_widths() {
        assert_eq!(PixelFormat::Mono01.transfer_width(), Width::Bits8);
        assert_eq!(PixelFormat::Rgb565.transfer_width(), Width::Bits16);
        assert_eq!(PixelFormat::Rgb888.transfer_width(), Width::Bits8);
        assert_eq!(PixelFormat::Xrgb8888.transfer_width(), Width::Bits24);
    }
}
