//! Register interface shared between contexts.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;

use crate::register::Lcdreg;
use crate::transport::Transport;

/// An [`Lcdreg`] behind a lock.
///
/// Hold the lock across multi-register sequences (address window then
/// pixel write) so another context cannot interleave. The closure passed to
/// [`SharedLcdreg::lock`] must not lock the same handle again.
pub struct SharedLcdreg<R: RawMutex, T, D> {
    inner: Mutex<R, RefCell<Lcdreg<T, D>>>,
}

impl<R: RawMutex, T: Transport, D: DelayNs> SharedLcdreg<R, T, D> {
    /// Put `reg` behind the lock.
    pub fn new(reg: Lcdreg<T, D>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(reg)),
        }
    }

    /// Run `f` with exclusive access to the register interface.
    pub fn lock<U>(&self, f: impl FnOnce(&mut Lcdreg<T, D>) -> U) -> U {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Take the register interface back out of the lock.
    pub fn into_inner(self) -> Lcdreg<T, D> {
        self.inner.into_inner().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use platform::mocks::{MockDelay, MockLine, MockSpi};

    use super::*;
    use crate::config::RegisterConfig;
    use crate::spi::{SpiConfig, SpiTransport};
    use crate::transfer::{Transfer, Width};

    #[test]
    fn sequence_runs_under_one_lock() {
        let spi = MockSpi::new(10_000_000);
        let transport: SpiTransport<_, _> =
            SpiTransport::four_wire(spi.clone(), MockLine::new(), None, SpiConfig::default())
                .unwrap();
        let reg = Lcdreg::new(transport, MockDelay::new(), RegisterConfig::new(Width::Bits8)).unwrap();
        let shared: SharedLcdreg<NoopRawMutex, _, _> = SharedLcdreg::new(reg);

        let pixels = [0u8; 4];
        shared
            .lock(|reg| {
                crate::writereg!(reg, 0x2A, 0, 0, 0, 1)?;
                crate::writereg!(reg, 0x2B, 0, 0, 0, 1)?;
                reg.write(0x2C, Some(&Transfer::data(&pixels[..])))
            })
            .unwrap();
        assert_eq!(spi.messages().len(), 6);

        let reg = shared.into_inner();
        assert_eq!(reg.default_width(), Width::Bits8);
    }
}
