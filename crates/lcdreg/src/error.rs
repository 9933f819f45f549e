//! Register access errors

use thiserror_no_std::Error as ThisError;

/// Which part of a physical transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportFault {
    /// The bus controller rejected or failed the message
    Bus,
    /// A buffer could not be mapped for DMA
    DmaMapping,
    /// A control or data line could not be driven or sampled
    Gpio,
    /// Data lines could not be switched between input and output
    DirectionSwitch,
    /// The I80 address latch could not be set
    Address,
}

impl core::fmt::Display for TransportFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Bus => "bus transfer",
            Self::DmaMapping => "DMA mapping",
            Self::Gpio => "GPIO access",
            Self::DirectionSwitch => "direction switch",
            Self::Address => "address latch",
        })
    }
}

/// Register interface error
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Malformed transfer: empty buffer, unsupported width, element type not
    /// matching the width, or a count the width emulation cannot pack
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Read requested on write-only wiring
    #[error("device is not readable")]
    NotReadable,
    /// The physical transfer failed
    #[error("{0} failed")]
    Transport(TransportFault),
    /// Scratch buffer allocation failed
    #[error("out of memory")]
    ResourceExhausted,
    /// I80 address window overlaps another device
    #[error("address conflict")]
    AddressConflict,
}

impl From<::i80::Error> for Error {
    fn from(value: ::i80::Error) -> Self {
        match value {
            ::i80::Error::AddressConflict(_) => Self::AddressConflict,
            ::i80::Error::InvalidDevice { .. } => Self::InvalidArgument("invalid i80 device window"),
            ::i80::Error::NoSuchDevice => Self::InvalidArgument("i80 device not registered"),
            ::i80::Error::InvalidAddress(_) => Self::InvalidArgument("address outside i80 device"),
            ::i80::Error::NotReadable => Self::NotReadable,
            ::i80::Error::NotWritable => Self::InvalidArgument("i80 bus not writable"),
            ::i80::Error::AddressLatch => Self::Transport(TransportFault::Address),
            ::i80::Error::InvalidConfig(reason) => Self::InvalidArgument(reason),
            ::i80::Error::RegistryFull => Self::ResourceExhausted,
            ::i80::Error::Transport => Self::Transport(TransportFault::Bus),
        }
    }
}

/// Log a HAL error and turn it into a transport failure.
pub(crate) fn transport<E: core::fmt::Debug>(fault: TransportFault) -> impl FnOnce(E) -> Error {
    move |err| {
        tracing::warn!(?err, %fault, "lcdreg: transport error");
        Error::Transport(fault)
    }
}
