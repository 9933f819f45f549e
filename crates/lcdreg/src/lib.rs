//! LCD controller register access
//!
//! Display controllers are programmed by writing a register number with the
//! selector line low and then a run of values with it high. This crate puts
//! one register API, [`Lcdreg`], in front of the buses those controllers
//! hang off:
//!
//! ```text
//! Lcdreg (width resolution, readability, reset, write_u32/read_u32)
//!     ├── SpiTransport       4-wire D/C, 3-wire 9-bit, startbyte framing
//!     ├── ParallelTransport  bit-banged 8/16/.. data lines + WR strobe
//!     └── I80Transport       device on a shared I80 bus
//! ```
//!
//! Elements are 8, 9, 16, 24 or 32 bits wide. Widths a bus cannot clock
//! natively are repacked on the way out (big-endian byte streams, 9-bit
//! tagged groups, multi-word splits).
//!
//! # Features
//!
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
pub mod console;
pub mod error;
pub mod i80;
pub mod par;
pub mod register;
mod scratch;
pub mod shared;
pub mod spi;
pub mod transfer;
pub mod transport;
pub mod width;

pub use self::i80::I80Transport;
pub use config::{Quirks, RegisterConfig};
pub use console::RegisterConsole;
pub use error::{Error, TransportFault};
pub use par::ParallelTransport;
pub use register::Lcdreg;
pub use shared::SharedLcdreg;
pub use spi::{SpiConfig, SpiTransport, StartByte, WireMode};
pub use transfer::{ReadTransfer, Selector, Transfer, Width, WidthMask};
pub use transport::{BusContext, Transport};
