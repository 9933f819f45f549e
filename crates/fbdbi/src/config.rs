//! Display configuration
//!
//! Resolved from key/value properties as a board description would carry
//! them:
//!
//! | Key        | Value                                   | Default  |
//! |------------|-----------------------------------------|----------|
//! | `width`    | panel width in pixels                   | required |
//! | `height`   | panel height in pixels                  | required |
//! | `rotation` | 0, 90, 180 or 270                       | 0        |
//! | `format`   | mono01, rgb565, rgb888, xrgb8888        | rgb565   |
//! | `readable` | true/false (bare key means true)        | false    |
//! | `regwidth` | register width in bits                  | 8        |
//! | `bgr`      | true/false (bare key means true)        | false    |
//!
//! Unknown keys are ignored.

use lcdreg::{RegisterConfig, Width};

use crate::error::ConfigError;
use crate::format::PixelFormat;

/// Panel rotation, clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u32", into = "u32"))]
pub enum Rotation {
    /// Native orientation
    #[default]
    Deg0,
    /// Quarter turn
    Deg90,
    /// Half turn
    Deg180,
    /// Three-quarter turn
    Deg270,
}

impl Rotation {
    /// Parse degrees.
    pub const fn from_degrees(degrees: u32) -> Result<Self, ConfigError> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(ConfigError::InvalidRotation(other)),
        }
    }

    /// Degrees.
    pub const fn degrees(self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Whether the visible x/y extents are the panel's swapped.
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }

    /// Table slot for per-rotation settings.
    pub const fn index(self) -> usize {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 1,
            Self::Deg180 => 2,
            Self::Deg270 => 3,
        }
    }
}

impl TryFrom<u32> for Rotation {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_degrees(value)
    }
}

impl From<Rotation> for u32 {
    fn from(value: Rotation) -> Self {
        value.degrees()
    }
}

/// Resolved display settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DisplayConfig {
    /// Panel width in native orientation
    pub width: u32,
    /// Panel height in native orientation
    pub height: u32,
    /// Rotation
    #[cfg_attr(feature = "serde", serde(default))]
    pub rotation: Rotation,
    /// Video memory layout
    #[cfg_attr(feature = "serde", serde(default))]
    pub format: PixelFormat,
    /// Whether the wiring allows reading back
    #[cfg_attr(feature = "serde", serde(default))]
    pub readable: bool,
    /// Register width override in bits
    #[cfg_attr(feature = "serde", serde(default))]
    pub regwidth: Option<u8>,
    /// Blue/red swapped panel
    #[cfg_attr(feature = "serde", serde(default))]
    pub bgr: bool,
}

fn parse_u32(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue(key))
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "" | "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key)),
    }
}

impl DisplayConfig {
    /// Rgb565, unrotated, write-only panel of `width` x `height`.
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rotation: Rotation::Deg0,
            format: PixelFormat::Rgb565,
            readable: false,
            regwidth: None,
            bgr: false,
        }
    }

    /// Resolve from `(key, value)` properties.
    pub fn from_properties<'a>(
        properties: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ConfigError> {
        let mut width = None;
        let mut height = None;
        let mut config = Self::new(0, 0);
        for (key, value) in properties {
            match key {
                "width" => width = Some(parse_u32("width", value)?),
                "height" => height = Some(parse_u32("height", value)?),
                "rotation" => {
                    config.rotation = Rotation::from_degrees(parse_u32("rotation", value)?)?;
                }
                "format" => config.format = value.trim().parse()?,
                "readable" => config.readable = parse_bool("readable", value)?,
                "bgr" => config.bgr = parse_bool("bgr", value)?,
                "regwidth" => {
                    let bits = u8::try_from(parse_u32("regwidth", value)?)
                        .map_err(|_| ConfigError::InvalidValue("regwidth"))?;
                    Width::from_bits(bits).map_err(|_| ConfigError::InvalidValue("regwidth"))?;
                    config.regwidth = Some(bits);
                }
                other => tracing::debug!(key = other, "fbdbi: ignoring property"),
            }
        }
        config.width = width.ok_or(ConfigError::MissingProperty("width"))?;
        config.height = height.ok_or(ConfigError::MissingProperty("height"))?;
        config.validate()?;
        tracing::debug!(
            width = config.width,
            height = config.height,
            rotation = config.rotation.degrees(),
            format = config.format.as_str(),
            "fbdbi: display configured"
        );
        Ok(config)
    }

    /// Check geometry against the format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::InvalidValue("width"));
        }
        if self.height == 0 {
            return Err(ConfigError::InvalidValue("height"));
        }
        if self.format == PixelFormat::Mono01 && self.xres() % 8 != 0 {
            return Err(ConfigError::InvalidValue("width"));
        }
        if let Some(bits) = self.regwidth {
            Width::from_bits(bits).map_err(|_| ConfigError::InvalidValue("regwidth"))?;
        }
        Ok(())
    }

    /// Visible width after rotation.
    pub const fn xres(&self) -> u32 {
        if self.rotation.swaps_axes() {
            self.height
        } else {
            self.width
        }
    }

    /// Visible height after rotation.
    pub const fn yres(&self) -> u32 {
        if self.rotation.swaps_axes() {
            self.width
        } else {
            self.height
        }
    }

    /// Bytes per visible line.
    pub const fn line_length(&self) -> u32 {
        self.format.line_length(self.xres())
    }

    /// Register width, `default` unless overridden.
    pub fn register_width(&self, default: Width) -> Width {
        self.regwidth
            .and_then(|bits| Width::from_bits(bits).ok())
            .unwrap_or(default)
    }

    /// Register interface settings for this display.
    pub fn register_config(&self, default_width: Width) -> RegisterConfig {
        let config = RegisterConfig::new(self.register_width(default_width));
        if self.readable {
            config.readable()
        } else {
            config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_with_defaults() {
        let config =
            DisplayConfig::from_properties([("width", "240"), ("height", "320")]).unwrap();
        assert_eq!(config, DisplayConfig::new(240, 320));
        assert_eq!(config.register_config(Width::Bits8), RegisterConfig::new(Width::Bits8));
    }

    #[test]
    fn rotation_swaps_visible_extents() {
        let config = DisplayConfig::from_properties([
            ("width", "240"),
            ("height", "320"),
            ("rotation", "90"),
        ])
        .unwrap();
        assert_eq!((config.xres(), config.yres()), (320, 240));
        assert_eq!(config.line_length(), 640);
    }

    #[test]
    fn flags_and_overrides() {
        let config = DisplayConfig::from_properties([
            ("width", "128"),
            ("height", "64"),
            ("format", "mono01"),
            ("readable", ""),
            ("bgr", "false"),
            ("regwidth", "16"),
            ("reset-gpios", "17"),
        ])
        .unwrap();
        assert_eq!(config.format, PixelFormat::Mono01);
        assert!(config.readable);
        assert!(!config.bgr);
        assert_eq!(config.register_width(Width::Bits8), Width::Bits16);
        assert!(config.register_config(Width::Bits8).readable);
    }

    #[test]
    fn bad_properties() {
        assert_eq!(
            DisplayConfig::from_properties([("height", "64")]),
            Err(ConfigError::MissingProperty("width"))
        );
        assert_eq!(
            DisplayConfig::from_properties([("width", "64"), ("height", "64"), ("rotation", "45")]),
            Err(ConfigError::InvalidRotation(45))
        );
        assert_eq!(
            DisplayConfig::from_properties([("width", "64"), ("height", "64"), ("format", "yuv")]),
            Err(ConfigError::UnknownFormat)
        );
        assert_eq!(
            DisplayConfig::from_properties([("width", "x"), ("height", "64")]),
            Err(ConfigError::InvalidValue("width"))
        );
        assert_eq!(
            DisplayConfig::from_properties([("width", "64"), ("height", "64"), ("regwidth", "12")]),
            Err(ConfigError::InvalidValue("regwidth"))
        );
    }

    #[test]
    fn mono_needs_whole_bytes_per_line() {
        assert_eq!(
            DisplayConfig::from_properties([("width", "100"), ("height", "64"), ("format", "mono01")]),
            Err(ConfigError::InvalidValue("width"))
        );
    }
}
