//! DMA abstraction layer
//!
//! Streaming mappings of transmit buffers. A mapping lives for exactly one
//! bus message; whoever maps a buffer must unmap it before returning, on the
//! error path as well.

use crate::words::Words;

/// Device-visible handle for one mapped buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaHandle {
    /// Bus address the controller should read from
    pub bus_addr: usize,
    /// Mapped length in bytes
    pub len: usize,
}

/// DMA mapping failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// This controller cannot do DMA
    Unsupported,
    /// The buffer could not be mapped for device access
    MappingFailed,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "DMA not supported"),
            Self::MappingFailed => write!(f, "DMA mapping failed"),
        }
    }
}

/// Maps transmit buffers for device access.
///
/// Every method has a default, so a controller without DMA implements this
/// with an empty `impl` block.
pub trait DmaMapper {
    /// Whether mapping is available at all.
    fn dma_capable(&self) -> bool {
        false
    }

    /// Map `words` for a memory-to-device transfer.
    fn map_to_device(&mut self, words: &Words<'_>) -> Result<DmaHandle, DmaError> {
        let _ = words;
        Err(DmaError::Unsupported)
    }

    /// Release a mapping created by [`DmaMapper::map_to_device`].
    fn unmap(&mut self, handle: DmaHandle) {
        let _ = handle;
    }
}

/// Unmap every handle in `mapped`, leaving it empty.
pub fn unmap_all<M: DmaMapper + ?Sized, const N: usize>(
    mapper: &mut M,
    mapped: &mut heapless::Vec<DmaHandle, N>,
) {
    while let Some(handle) = mapped.pop() {
        mapper.unmap(handle);
    }
}
