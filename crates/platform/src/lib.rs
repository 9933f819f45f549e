//! Hardware Abstraction Layer (HAL) for the LCD register stack
//!
//! This crate provides the trait seams the register transports are written
//! against, so every transport can be exercised without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Panel / framebuffer code (fbdbi)
//!         ↓
//! Register interface + transports (lcdreg, i80)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Board HAL (embedded-hal implementations, SPI controller drivers)
//! ```
//!
//! # Abstraction Levels
//!
//! - [`peripheral`] - SPI controller with per-segment word size and clock
//! - [`gpio`] - Bidirectional data lines and direction caching
//! - [`dma`] - Streaming DMA mappings
//! - [`words`] - Typed word slices shared by every bus
//!
//! # Features
//!
//! - `std`: Enable the recording mocks in [`mocks`] outside of this crate's tests
//! - `defmt`: Enable defmt logging derives
//!
//! # Example
//!
//! ```no_run
//! use platform::{Segment, SpiMaster, Words};
//!
//! fn send_command<S: SpiMaster>(spi: &mut S, command: u8) -> Result<(), S::Error> {
//!     let bytes = [command];
//!     spi.transfer(&mut [Segment::write(Words::U8(&bytes), 8)])
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::indexing_slicing))]

#[cfg(any(test, feature = "std"))]
extern crate alloc;

pub mod dma;
pub mod gpio;
pub mod mocks;
pub mod peripheral;
pub mod words;

// Re-export GPIO types
pub use gpio::{BusDirection, DataLine, Direction, InputPin, NoPin, OutputPin, PinState};

// Re-export peripheral types
pub use peripheral::{bpw_mask, Segment, SpiMaster};

// Re-export DMA types
pub use dma::{DmaError, DmaHandle, DmaMapper};

pub use words::{Words, WordsMut};
