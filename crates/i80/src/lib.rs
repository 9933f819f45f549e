//! I80 bus fabric
//!
//! A small addressable bus modelled on the Intel 8080 parallel interface. A
//! [`I80Master`] drives the physical address and data lines; devices claim
//! an address window on it and talk to the master through an
//! [`I80Session`], which holds the bus for the duration of one access and
//! resets the address latch when it ends.
//!
//! ```text
//! SharedI80Bus (bus lock)
//!     └── I80Bus ── registry: [Device { address, mask }, ...]
//!             └── I80Master (GpioMaster, controller drivers)
//! ```
//!
//! # Features
//!
//! - `std`: Enable [`mock::MockI80Master`] outside of this crate's tests
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
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::indexing_slicing))]

#[cfg(any(test, feature = "std"))]
extern crate alloc;

pub mod bus;
pub mod error;
pub mod gpio;
pub mod master;
pub mod mock;
pub mod shared;

pub use bus::{Device, DeviceId, I80Bus, I80Session, MAX_DEVICES};
pub use error::Error;
pub use gpio::{GpioMaster, GpioMasterError};
pub use master::{word_size_for, I80Master};
pub use shared::SharedI80Bus;
