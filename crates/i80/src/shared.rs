//! Bus shared between several device drivers.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::bus::{DeviceId, I80Bus, I80Session};
use crate::error::Error;
use crate::master::I80Master;

/// An [`I80Bus`] behind the bus lock.
///
/// Closures passed to [`SharedI80Bus::lock`] and
/// [`SharedI80Bus::with_session`] must not lock the same bus again.
pub struct SharedI80Bus<R: RawMutex, M> {
    inner: Mutex<R, RefCell<I80Bus<M>>>,
}

impl<R: RawMutex, M: I80Master> SharedI80Bus<R, M> {
    /// Put `bus` behind the lock.
    pub fn new(bus: I80Bus<M>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(bus)),
        }
    }

    /// Run `f` with exclusive access to the bus.
    pub fn lock<T>(&self, f: impl FnOnce(&mut I80Bus<M>) -> T) -> T {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Claim an address window.
    pub fn register(&self, address: u32, size: u32) -> Result<DeviceId, Error> {
        self.lock(|bus| bus.register(address, size))
    }

    /// Run `f` inside an access window for `id`.
    ///
    /// The window is closed whatever `f` returns; an error from `f` takes
    /// precedence over a failure to close.
    pub fn with_session<T, E>(
        &self,
        id: DeviceId,
        f: impl FnOnce(&mut I80Session<'_, M>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<Error>,
    {
        self.lock(|bus| {
            let mut session = bus.open(id)?;
            let result = f(&mut session);
            let closed = session.close();
            let value = result?;
            closed?;
            Ok(value)
        })
    }

    /// Take the bus back out of the lock.
    pub fn into_inner(self) -> I80Bus<M> {
        self.inner.into_inner().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use platform::Words;

    use super::*;
    use crate::mock::{BusOp, MockI80Master};

    #[test]
    fn session_closes_after_failure() {
        let master = MockI80Master::new(8, 8);
        let shared: SharedI80Bus<NoopRawMutex, _> = SharedI80Bus::new(I80Bus::new(master.clone()));
        let id = shared.register(0x10, 4).unwrap();

        let result: Result<(), Error> =
            shared.with_session(id, |session| session.write(8, Words::U8(&[1])));
        assert_eq!(result, Err(Error::InvalidAddress(8)));
        assert_eq!(master.ops(), [BusOp::SetAddress(0)]);
    }

    #[test]
    fn session_returns_value() {
        let master = MockI80Master::new(8, 8);
        let shared: SharedI80Bus<NoopRawMutex, _> = SharedI80Bus::new(I80Bus::new(master));
        let id = shared.register(0, 2).unwrap();
        let width = shared.with_session(id, |session| Ok::<_, Error>(session.data_width()));
        assert_eq!(width, Ok(8));
    }
}
