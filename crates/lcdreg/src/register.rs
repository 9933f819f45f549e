//! Register interface
//!
//! [`Lcdreg`] is the one handle panel code talks to. It validates transfer
//! descriptors, resolves default widths and hands the access to its bus
//! [`Transport`]. Exclusive access is expressed through `&mut self`; share a
//! handle between contexts with [`crate::SharedLcdreg`].

use embedded_hal::delay::DelayNs;
use platform::{Words, WordsMut};

use crate::config::{Quirks, RegisterConfig};
use crate::error::Error;
use crate::transfer::{ReadTransfer, Transfer, Width};
use crate::transport::{BusContext, Transport};

/// Most values [`Lcdreg::write_u32`] and [`Lcdreg::read_u32`] stage at once.
pub const MAX_INLINE_VALUES: usize = 64;

/// Register access handle for one attached controller.
pub struct Lcdreg<T, D> {
    transport: T,
    delay: D,
    config: RegisterConfig,
}

impl<T: Transport, D: DelayNs> Lcdreg<T, D> {
    /// Bind a transport.
    ///
    /// Fails with `InvalidArgument` if the configuration asks for reads the
    /// transport wiring cannot do.
    pub fn new(transport: T, delay: D, config: RegisterConfig) -> Result<Self, Error> {
        if config.readable && !transport.readable() {
            return Err(Error::InvalidArgument("transport wiring is write-only"));
        }
        tracing::debug!(
            default_width = config.default_width.bits(),
            readable = config.readable,
            quirks = config.quirks.bits(),
            "lcdreg: attached"
        );
        Ok(Self {
            transport,
            delay,
            config,
        })
    }

    /// Width register numbers are sent at.
    pub fn default_width(&self) -> Width {
        self.config.default_width
    }

    /// Change the register width, for controllers that switch interface
    /// mode during init.
    pub fn set_default_width(&mut self, width: Width) {
        self.config.default_width = width;
    }

    /// Whether reads are allowed.
    pub fn is_readable(&self) -> bool {
        self.config.readable
    }

    /// Protocol quirks.
    pub fn quirks(&self) -> Quirks {
        self.config.quirks
    }

    /// The bus driver.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Give back the transport and delay.
    pub fn release(self) -> (T, D) {
        (self.transport, self.delay)
    }

    fn context(&self) -> BusContext {
        BusContext {
            default_width: self.config.default_width,
            quirks: self.config.quirks,
        }
    }

    /// Select `regnr`, then send `transfer` as the data phase.
    ///
    /// An absent or empty transfer sends only the register-select phase.
    pub fn write(&mut self, regnr: u32, transfer: Option<&Transfer<'_>>) -> Result<(), Error> {
        let ctx = self.context();
        let resolved = match transfer {
            Some(t) if !t.words.is_empty() => {
                let width = t.width_or(ctx.default_width);
                width.check_element_size(t.words.element_size())?;
                Some(t.with_width(width))
            }
            _ => None,
        };
        tracing::trace!(
            regnr,
            selector = ?resolved.map(|t| t.selector),
            width = resolved.and_then(|t| t.width).map(Width::bits),
            count = resolved.map_or(0, |t| t.count()),
            "lcdreg: write"
        );
        self.transport.write(&ctx, regnr, resolved.as_ref())
    }

    /// Select `regnr`, then read `transfer.count()` elements into it.
    pub fn read(&mut self, regnr: u32, transfer: &mut ReadTransfer<'_>) -> Result<(), Error> {
        if !self.config.readable {
            return Err(Error::NotReadable);
        }
        if transfer.words.is_empty() {
            return Err(Error::InvalidArgument("read of zero elements"));
        }
        let ctx = self.context();
        let width = transfer.width_or(ctx.default_width);
        width.check_element_size(transfer.words.element_size())?;
        transfer.width = Some(width);
        tracing::trace!(
            regnr,
            selector = ?transfer.selector,
            width = width.bits(),
            count = transfer.count(),
            "lcdreg: read"
        );
        self.transport.read(&ctx, regnr, transfer)
    }

    /// Pulse the reset line and wait for the controller to boot.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.transport.reset(&mut self.delay)
    }

    /// Wait `ms` milliseconds with the handle's delay provider.
    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// Write `regnr` followed by `values`, each narrowed to a byte when the
    /// default width is 8 bits or less and to a halfword otherwise.
    #[allow(clippy::cast_possible_truncation)] // narrowing to the register width is the contract
    pub fn write_u32(&mut self, regnr: u32, values: &[u32]) -> Result<(), Error> {
        if values.len() > MAX_INLINE_VALUES {
            return Err(Error::ResourceExhausted);
        }
        if self.config.default_width.bits() <= 8 {
            let staged: heapless::Vec<u8, MAX_INLINE_VALUES> =
                values.iter().map(|&v| v as u8).collect();
            let transfer = Transfer::data(Words::U8(staged.as_slice())).with_width(Width::Bits8);
            self.write(regnr, Some(&transfer))
        } else {
            let staged: heapless::Vec<u16, MAX_INLINE_VALUES> =
                values.iter().map(|&v| v as u16).collect();
            let transfer = Transfer::data(Words::U16(staged.as_slice())).with_width(Width::Bits16);
            self.write(regnr, Some(&transfer))
        }
    }

    /// Read `out.len()` elements of `regnr` at the default width.
    ///
    /// The data-phase selector follows [`Quirks::INDEX0_ON_READ`].
    pub fn read_u32(&mut self, regnr: u32, out: &mut [u32]) -> Result<(), Error> {
        if out.len() > MAX_INLINE_VALUES {
            return Err(Error::ResourceExhausted);
        }
        let selector = self.config.quirks.read_selector();
        match self.config.default_width.bytes_per_word() {
            1 => {
                let mut staged = [0u8; MAX_INLINE_VALUES];
                let buf = staged.get_mut(..out.len()).ok_or(Error::ResourceExhausted)?;
                let mut transfer = ReadTransfer::data(WordsMut::U8(buf)).with_selector(selector);
                self.read(regnr, &mut transfer)?;
                for (dst, src) in out.iter_mut().zip(staged.iter()) {
                    *dst = u32::from(*src);
                }
            }
            2 => {
                let mut staged = [0u16; MAX_INLINE_VALUES];
                let buf = staged.get_mut(..out.len()).ok_or(Error::ResourceExhausted)?;
                let mut transfer = ReadTransfer::data(WordsMut::U16(buf)).with_selector(selector);
                self.read(regnr, &mut transfer)?;
                for (dst, src) in out.iter_mut().zip(staged.iter()) {
                    *dst = u32::from(*src);
                }
            }
            _ => {
                let mut transfer = ReadTransfer::data(WordsMut::U32(out)).with_selector(selector);
                self.read(regnr, &mut transfer)?;
            }
        }
        Ok(())
    }
}

/// Write a register followed by inline `u32` values.
///
/// ```ignore
/// writereg!(reg, 0x2A, 0x00, 0x00, 0x00, 0xEF)?;
/// ```
#[macro_export]
macro_rules! writereg {
    ($reg:expr, $regnr:expr $(,)?) => {
        $reg.write_u32($regnr, &[])
    };
    ($reg:expr, $regnr:expr, $($value:expr),+ $(,)?) => {
        $reg.write_u32($regnr, &[$($value),+])
    };
}
