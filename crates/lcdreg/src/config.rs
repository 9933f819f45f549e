//! Per-device configuration

use crate::transfer::{Selector, Width};

bitflags::bitflags! {
    /// Controller protocol quirks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Quirks: u32 {
        /// Clock register-select transfers at min(2 MHz, max_speed / 2)
        const SLOW_INDEX0_WRITE = 1 << 0;
        /// Read the data phase with the selector line low
        const INDEX0_ON_READ = 1 << 1;
    }
}

/// Clock ceiling for slowed transfers.
pub const SLOW_CLOCK_HZ: u32 = 2_000_000;

impl Quirks {
    /// Selector used for the data phase of a read.
    pub fn read_selector(self) -> Selector {
        if self.contains(Self::INDEX0_ON_READ) {
            Selector::Command
        } else {
            Selector::Data
        }
    }
}

/// Register interface settings fixed at attach time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterConfig {
    /// Width register numbers are sent at, and the default element width
    pub default_width: Width,
    /// Whether the wiring allows reading back
    pub readable: bool,
    /// Protocol quirks
    pub quirks: Quirks,
}

impl RegisterConfig {
    /// Write-only device at `default_width`, no quirks.
    pub const fn new(default_width: Width) -> Self {
        Self {
            default_width,
            readable: false,
            quirks: Quirks::empty(),
        }
    }

    /// Allow reads.
    #[must_use]
    pub const fn readable(mut self) -> Self {
        self.readable = true;
        self
    }

    /// Set the quirks.
    #[must_use]
    pub const fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self::new(Width::Bits8)
    }
}
