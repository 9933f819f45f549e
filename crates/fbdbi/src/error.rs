//! Framebuffer errors

use thiserror_no_std::Error as ThisError;

/// Display property problem found while resolving a [`crate::DisplayConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `format` is not one of mono01, rgb565, rgb888, xrgb8888
    #[error("unknown pixel format")]
    UnknownFormat,
    /// `rotation` is not 0, 90, 180 or 270
    #[error("invalid rotation: {0}")]
    InvalidRotation(u32),
    /// A required property is absent
    #[error("missing property: {0}")]
    MissingProperty(&'static str),
    /// A property value does not parse
    #[error("invalid value for {0}")]
    InvalidValue(&'static str),
}

/// Framebuffer and display update error
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Register access failed; the attempted line range is indeterminate
    #[error("register access: {0}")]
    Register(#[from] lcdreg::Error),
    /// Line range empty, reversed or beyond the visible height
    #[error("invalid line range {ys}..={ye}")]
    InvalidLineRange {
        /// First line
        ys: u32,
        /// Last line
        ye: u32,
    },
    /// The controller has no setting for this pixel format
    #[error("pixel format not supported by the controller")]
    UnsupportedFormat,
    /// Configuration could not be resolved
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    /// Video memory could not be allocated
    #[error("out of memory")]
    OutOfMemory,
}
