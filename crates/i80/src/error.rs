//! I80 bus errors

use thiserror_no_std::Error;

/// Errors raised by the bus registry, sessions and masters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Address range overlaps a registered device
    #[error("address 0x{0:x} already in use")]
    AddressConflict(u32),
    /// Size not a power of two, address not aligned to its size, or address
    /// beyond the master's address width
    #[error("invalid device address 0x{address:x} size 0x{size:x}")]
    InvalidDevice {
        /// Requested base address
        address: u32,
        /// Requested size
        size: u32,
    },
    /// No device registered under this id
    #[error("no such device")]
    NoSuchDevice,
    /// Address outside the device's mask (ENXIO)
    #[error("address 0x{0:x} outside device window")]
    InvalidAddress(u32),
    /// Master wired without a read strobe
    #[error("bus not readable")]
    NotReadable,
    /// Master wired without a write strobe
    #[error("bus not writable")]
    NotWritable,
    /// The master could not latch an address
    #[error("address latch failed")]
    AddressLatch,
    /// Master configuration rejected
    #[error("invalid master configuration: {0}")]
    InvalidConfig(&'static str),
    /// Device table full
    #[error("device table full")]
    RegistryFull,
    /// The master reported a failure
    #[error("bus transfer failed")]
    Transport,
}
