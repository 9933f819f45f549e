//! Bit-banged 8080-style parallel transport
//!
//! Up to 24 data lines, a write strobe, a D/C line, and optional read
//! strobe, chip select and reset. Each bus word is latched by pulsing the
//! write strobe low, driving only the data lines whose bit differs from the
//! previous word, then releasing the strobe.
//!
//! Elements wider than the bus go out as several bus words, most
//! significant piece first, when their width is a whole multiple of the bus
//! width.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use platform::gpio::{bit_is_set, sample_bits};
use platform::{BusDirection, DataLine, Direction, Words};

use crate::error::{transport, Error, TransportFault};
use crate::transfer::{ReadTransfer, RegisterIndex, Selector, Transfer, Width};
use crate::transport::{pulse_reset, BusContext, Transport};
use crate::width::{bus_piece, bus_words_per_element, push_piece};

/// Most data lines a parallel bus may have.
pub const MAX_DATA_LINES: usize = 24;

/// A register transport over GPIO lines.
///
/// `L` are the data lines, `P` every control line.
pub struct ParallelTransport<L, P> {
    data: heapless::Vec<L, MAX_DATA_LINES>,
    dc: P,
    wr: P,
    rd: Option<P>,
    cs: Option<P>,
    reset: Option<P>,
    prev: Option<u32>,
    direction: BusDirection,
}

impl<L: DataLine, P: OutputPin> ParallelTransport<L, P> {
    /// Bus over `data` (line `n` carries bit `n`) with D/C line `dc` and
    /// write strobe `wr`.
    pub fn new(data: impl IntoIterator<Item = L>, dc: P, wr: P) -> Result<Self, Error> {
        let mut lines = heapless::Vec::new();
        for line in data {
            lines
                .push(line)
                .map_err(|_| Error::InvalidArgument("more than 24 data lines"))?;
        }
        if lines.is_empty() {
            return Err(Error::InvalidArgument("parallel bus needs data lines"));
        }
        tracing::debug!(width = lines.len(), "lcdreg: parallel transport ready");
        Ok(Self {
            data: lines,
            dc,
            wr,
            rd: None,
            cs: None,
            reset: None,
            prev: None,
            direction: BusDirection::new(),
        })
    }

    /// Add a read strobe, making the bus readable.
    #[must_use]
    pub fn with_rd(mut self, rd: P) -> Self {
        self.rd = Some(rd);
        self
    }

    /// Add a chip select, asserted around every phase.
    #[must_use]
    pub fn with_cs(mut self, cs: P) -> Self {
        self.cs = Some(cs);
        self
    }

    /// Add a reset line.
    #[must_use]
    pub fn with_reset(mut self, reset: P) -> Self {
        self.reset = Some(reset);
        self
    }

    /// Number of data lines.
    pub fn bus_width(&self) -> usize {
        self.data.len()
    }

    fn switch(&mut self, direction: Direction) -> Result<(), Error> {
        match self.direction.switch(&mut self.data, direction) {
            Ok(true) => {
                self.prev = None;
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(err) => {
                self.prev = None;
                tracing::warn!(?err, ?direction, "lcdreg: data line direction switch failed");
                Err(Error::Transport(TransportFault::DirectionSwitch))
            }
        }
    }

    /// Latch one bus word.
    fn latch(&mut self, value: u32) -> Result<(), Error> {
        self.wr.set_low().map_err(transport(TransportFault::Gpio))?;
        let changed = self.prev.map_or(u32::MAX, |prev| prev ^ value);
        for (bit, line) in self.data.iter_mut().enumerate() {
            if bit_is_set(changed, bit) {
                line.set_state(PinState::from(bit_is_set(value, bit)))
                    .map_err(transport(TransportFault::Gpio))?;
            }
        }
        self.prev = Some(value);
        self.wr.set_high().map_err(transport(TransportFault::Gpio))
    }

    /// Sample one bus word.
    fn strobe_read(&mut self) -> Result<u32, Error> {
        let Some(rd) = self.rd.as_mut() else {
            return Err(Error::NotReadable);
        };
        rd.set_low().map_err(transport(TransportFault::Gpio))?;
        let value = sample_bits(&mut self.data).map_err(transport(TransportFault::Gpio))?;
        rd.set_high().map_err(transport(TransportFault::Gpio))?;
        Ok(value)
    }

    fn select_chip(&mut self, active: bool) -> Result<(), Error> {
        match self.cs.as_mut() {
            Some(cs) => cs
                .set_state(PinState::from(!active))
                .map_err(transport(TransportFault::Gpio)),
            None => Ok(()),
        }
    }

    /// Run `f` with chip select asserted; chip select is released on every
    /// path.
    fn framed<T>(
        &mut self,
        selector: Selector,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.select_chip(true)?;
        let result = self
            .dc
            .set_state(PinState::from(selector.is_data()))
            .map_err(transport(TransportFault::Gpio))
            .and_then(|()| f(self));
        let released = self.select_chip(false);
        let value = result?;
        released?;
        Ok(value)
    }

    fn write_phase(&mut self, selector: Selector, words: Words<'_>, width: Width) -> Result<(), Error> {
        let bus_bits = self.bus_width();
        let pieces = bus_words_per_element(width, bus_bits)?;
        self.switch(Direction::Output)?;
        self.framed(selector, |bus| {
            for value in words.iter() {
                for piece in (0..pieces).rev() {
                    bus.latch(bus_piece(value, piece, bus_bits))?;
                }
            }
            Ok(())
        })
    }

    fn select(&mut self, ctx: &BusContext, regnr: u32) -> Result<(), Error> {
        let index = RegisterIndex::new(regnr, ctx.default_width);
        self.write_phase(Selector::Command, index.words(), ctx.default_width)
    }

    /// Give back the lines: data, dc, wr, rd, cs, reset.
    #[allow(clippy::type_complexity)]
    pub fn release(
        self,
    ) -> (
        heapless::Vec<L, MAX_DATA_LINES>,
        P,
        P,
        Option<P>,
        Option<P>,
        Option<P>,
    ) {
        (self.data, self.dc, self.wr, self.rd, self.cs, self.reset)
    }
}

impl<L: DataLine, P: OutputPin> Transport for ParallelTransport<L, P> {
    fn write(
        &mut self,
        ctx: &BusContext,
        regnr: u32,
        transfer: Option<&Transfer<'_>>,
    ) -> Result<(), Error> {
        self.select(ctx, regnr)?;
        match transfer.filter(|t| !t.words.is_empty()) {
            Some(t) => self.write_phase(t.selector, t.words, t.width_or(ctx.default_width)),
            None => Ok(()),
        }
    }

    fn read(
        &mut self,
        ctx: &BusContext,
        regnr: u32,
        transfer: &mut ReadTransfer<'_>,
    ) -> Result<(), Error> {
        if self.rd.is_none() {
            return Err(Error::NotReadable);
        }
        let bus_bits = self.bus_width();
        let pieces = bus_words_per_element(transfer.width_or(ctx.default_width), bus_bits)?;
        self.select(ctx, regnr)?;

        self.switch(Direction::Input)?;
        let result = self.framed(transfer.selector, |bus| {
            for index in 0..transfer.count() {
                let mut value = 0u32;
                for _ in 0..pieces {
                    value = push_piece(value, bus.strobe_read()?, bus_bits);
                }
                transfer.words.set(index, value);
            }
            Ok(())
        });
        let restored = self.switch(Direction::Output);
        result?;
        restored
    }

    fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        pulse_reset(self.reset.as_mut(), delay)
    }

    fn readable(&self) -> bool {
        self.rd.is_some()
    }
}
