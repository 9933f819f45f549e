//! Device registry and access sessions
//!
//! Devices claim a naturally aligned, power-of-two window of the master's
//! address space. An [`I80Session`] is the access window for one device: it
//! borrows the bus exclusively and latches address 0 when it ends.

use platform::{Words, WordsMut};

use crate::error::Error;
use crate::master::I80Master;

/// Maximum number of devices on one bus.
pub const MAX_DEVICES: usize = 8;

/// A registered address window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Device {
    address: u32,
    mask: u32,
}

impl Device {
    /// Validate a window of `size` addresses at `address` on a bus with
    /// `address_width` address lines.
    ///
    /// `size` must be a power of two other than 1; 0 claims the whole address
    /// space.
    pub fn new(address: u32, size: u32, address_width: u8) -> Result<Self, Error> {
        let invalid = Error::InvalidDevice { address, size };
        if size == 1 || (size != 0 && !size.is_power_of_two()) {
            return Err(invalid);
        }
        let mask = size.wrapping_sub(1);
        if mask != u32::MAX && address & mask != 0 {
            return Err(invalid);
        }
        let limit = 1u64.checked_shl(u32::from(address_width)).unwrap_or(u64::MAX);
        if u64::from(address) >= limit {
            return Err(invalid);
        }
        Ok(Self { address, mask })
    }

    /// Base address.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Offsets within the window.
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Highest address in the window.
    pub fn last_address(&self) -> u32 {
        self.address | self.mask
    }

    /// Whether the two windows share at least one address.
    pub fn overlaps(&self, other: &Device) -> bool {
        self.address <= other.last_address() && other.address <= self.last_address()
    }
}

/// Handle for a registered device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId(usize);

/// One master and the devices registered on it.
pub struct I80Bus<M> {
    master: M,
    devices: heapless::Vec<Option<Device>, MAX_DEVICES>,
}

impl<M: I80Master> I80Bus<M> {
    /// Bus with no devices.
    pub fn new(master: M) -> Self {
        tracing::debug!(
            address_width = master.address_width(),
            data_width = master.data_width(),
            readable = master.readable(),
            writable = master.writable(),
            "i80: master registered"
        );
        Self {
            master,
            devices: heapless::Vec::new(),
        }
    }

    /// The master.
    pub fn master(&self) -> &M {
        &self.master
    }

    /// Give the master back.
    pub fn release(self) -> M {
        self.master
    }

    /// Claim `size` addresses starting at `address`.
    pub fn register(&mut self, address: u32, size: u32) -> Result<DeviceId, Error> {
        let device = Device::new(address, size, self.master.address_width())?;
        if let Some(existing) = self.devices.iter().flatten().find(|d| d.overlaps(&device)) {
            tracing::warn!(
                address,
                existing = existing.address,
                "i80: address already in use"
            );
            return Err(Error::AddressConflict(address));
        }
        let index = match self.devices.iter().position(Option::is_none) {
            Some(free) => {
                if let Some(slot) = self.devices.get_mut(free) {
                    *slot = Some(device);
                }
                free
            }
            None => {
                self.devices
                    .push(Some(device))
                    .map_err(|_| Error::RegistryFull)?;
                self.devices.len().saturating_sub(1)
            }
        };
        tracing::debug!(address, mask = device.mask, "i80: device registered");
        Ok(DeviceId(index))
    }

    /// Release a device's window.
    pub fn unregister(&mut self, id: DeviceId) -> Result<Device, Error> {
        self.devices
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(Error::NoSuchDevice)
    }

    /// Look up a registered device.
    pub fn device(&self, id: DeviceId) -> Option<Device> {
        self.devices.get(id.0).copied().flatten()
    }

    /// Start an access window for `id`.
    pub fn open(&mut self, id: DeviceId) -> Result<I80Session<'_, M>, Error> {
        let device = self.device(id).ok_or(Error::NoSuchDevice)?;
        Ok(I80Session {
            master: &mut self.master,
            device,
            closed: false,
        })
    }
}

/// Exclusive access window to one device.
///
/// Dropping the session latches address 0, like [`I80Session::close`] but
/// without reporting a failure.
pub struct I80Session<'b, M: I80Master> {
    master: &'b mut M,
    device: Device,
    closed: bool,
}

impl<M: I80Master> I80Session<'_, M> {
    /// The device this session addresses.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Data-bus width of the master.
    pub fn data_width(&self) -> u8 {
        self.master.data_width()
    }

    /// Whether the master can read.
    pub fn readable(&self) -> bool {
        self.master.readable()
    }

    /// Whether the master can write.
    pub fn writable(&self) -> bool {
        self.master.writable()
    }

    fn latch(&mut self, address: u32) -> Result<(), Error> {
        if address & !self.device.mask != 0 {
            return Err(Error::InvalidAddress(address));
        }
        self.master
            .set_address(self.device.address | address)
            .map_err(|err| {
                tracing::warn!(?err, address, "i80: set_address failed");
                Error::AddressLatch
            })
    }

    /// Write `words` at `address` within the device window.
    pub fn write(&mut self, address: u32, words: Words<'_>) -> Result<(), Error> {
        if !self.master.writable() {
            return Err(Error::NotWritable);
        }
        self.latch(address)?;
        self.master.write(words).map_err(|err| {
            tracing::warn!(?err, address, "i80: write failed");
            Error::Transport
        })
    }

    /// Read into `words` from `address` within the device window.
    pub fn read(&mut self, address: u32, words: WordsMut<'_>) -> Result<(), Error> {
        if !self.master.readable() {
            return Err(Error::NotReadable);
        }
        self.latch(address)?;
        self.master.read(words).map_err(|err| {
            tracing::warn!(?err, address, "i80: read failed");
            Error::Transport
        })
    }

    /// End the session, latching address 0.
    pub fn close(mut self) -> Result<(), Error> {
        self.closed = true;
        self.master.set_address(0).map_err(|err| {
            tracing::warn!(?err, "i80: failed to clear address latch");
            Error::AddressLatch
        })
    }
}

impl<M: I80Master> Drop for I80Session<'_, M> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.master.set_address(0) {
                tracing::warn!(?err, "i80: failed to clear address latch");
            }
        }
    }
}
