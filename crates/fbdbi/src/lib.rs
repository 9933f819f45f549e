//! Framebuffer consumer of the lcdreg register API
//!
//! Holds a display's video memory and flushes line ranges of it to the
//! controller through [`lcdreg::Lcdreg`]:
//!
//! ```text
//! DisplayConfig (properties / serde)
//!     └── Framebuffer (u8 / u16 / u32 memory)
//!             └── MipiDbi::update
//!                     0x2A column window
//!                     0x2B page window
//!                     0x2C pixels ──► Lcdreg::write
//! ```
//!
//! # Features
//!
//! - `serde`: Deserialize [`DisplayConfig`] from host-side files
//! - `defmt`: Enable defmt logging derives

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)
)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod format;
pub mod framebuffer;
pub mod mipi_dbi;

pub use config::{DisplayConfig, Rotation};
pub use error::{ConfigError, Error};
pub use format::PixelFormat;
pub use framebuffer::Framebuffer;
pub use mipi_dbi::{read_diagnostics, AddressModes, MipiDbi};
