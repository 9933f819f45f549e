//! SPI transport
//!
//! Carries register accesses over an SPI controller in one of three wire
//! modes:
//!
//! - **4-wire**: a separate D/C line selects command or data.
//! - **3-wire**: no D/C line; every byte travels as a 9-bit word with the
//!   selector in bit 8, packed eight-to-nine bytes when the controller lacks
//!   9-bit words.
//! - **Startbyte**: every message opens with a prefix byte carrying the
//!   selector and the read/write direction.
//!
//! Widths the controller cannot clock natively are repacked into bytes
//! through a scratch buffer allocated on first use. Long payloads are cut
//! into segments of at most [`SpiConfig::max_segment_len`] bytes, batched a
//! few per message.
//!
//! ```text
//!   write(regnr, transfer)
//!        │
//!        ├─ select phase ── D/C low │ 9-bit tagged │ prefix rs=0
//!        └─ data phase ──── D/C high│ 9-bit tagged │ prefix rs=1
//!                │
//!        native width? ──no──> repack through scratch (BE / 9-bit groups)
//!                │
//!        segments ≤ max_segment_len, DMA-mapped above the threshold
//! ```

// Chunk arithmetic is bounded by buffer lengths; divisors are element sizes
// or lengths validated at construction.
#![allow(clippy::arithmetic_side_effects)]

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use platform::dma::unmap_all;
use platform::{DmaHandle, NoPin, Segment, SpiMaster, Words, WordsMut};

use crate::error::{transport, Error, TransportFault};
use crate::scratch::{zeroed, Scratch, PAGE_SIZE};
use crate::transfer::{ReadTransfer, RegisterIndex, Selector, Transfer, Width, WidthMask};
use crate::transport::{pulse_reset, slow_speed, BusContext, Transport};
use crate::width::{
    nine_bit_padding, pack_9bit, pack_be16, pack_be24, pack_be32, tag_bytes, tag_halfwords,
    unpack_be16, NINE_BIT_GROUP_BYTES, NINE_BIT_GROUP_WORDS,
};

/// Segments per SPI message, startbyte prefix included.
const MAX_SEGMENTS: usize = 4;

/// Smallest scratch buffer able to hold one packed 9-bit group.
const MIN_SCRATCH_LEN: usize = NINE_BIT_GROUP_BYTES;

/// SPI transport tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// Allow DMA for large data phases
    pub dma: bool,
    /// Data phases larger than this many bytes use DMA
    pub dma_threshold: usize,
    /// Override of the controller's advertised word sizes
    pub bits_per_word_mask: Option<WidthMask>,
    /// Largest single segment in bytes
    pub max_segment_len: usize,
    /// Repacking buffer size in bytes (tag buffer size in words)
    pub scratch_len: usize,
    /// Never let a segment cross a page boundary
    pub split_at_page_boundary: bool,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            dma: false,
            dma_threshold: 128,
            bits_per_word_mask: None,
            max_segment_len: PAGE_SIZE,
            scratch_len: PAGE_SIZE,
            split_at_page_boundary: false,
        }
    }
}

/// Startbyte prefix layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartByte {
    /// `0 1 1 1 0 id rs rw`
    Standard {
        /// Device ID bit
        id: bool,
    },
    /// `1 1 1 1 1 rw rs 0`
    Variant2,
}

impl StartByte {
    /// Prefix for phase `selector`, reading if `read`.
    pub const fn byte(self, selector: Selector, read: bool) -> u8 {
        let rs = selector.is_data() as u8;
        let rw = read as u8;
        match self {
            Self::Standard { id } => 0x70 | ((id as u8) << 2) | (rs << 1) | rw,
            Self::Variant2 => 0xF8 | (rw << 2) | (rs << 1),
        }
    }
}

/// How the command/data selector reaches the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireMode {
    /// Dedicated D/C line
    FourWire,
    /// Selector in bit 8 of every word
    ThreeWire,
    /// Selector in a prefix byte
    StartByte(StartByte),
}

/// Controller plus framing; moves words, knows nothing about selectors
/// beyond the startbyte prefix.
struct Bus<S> {
    spi: S,
    framing: Option<StartByte>,
    config: SpiConfig,
    mask: WidthMask,
    scratch: Scratch<u8>,
}

impl<S: SpiMaster> Bus<S> {
    /// Elements of `words` that may go in the next segment.
    fn segment_len(&self, words: &Words<'_>) -> usize {
        let size = words.element_size();
        let mut len = (self.config.max_segment_len / size).max(1);
        if self.config.split_at_page_boundary {
            let to_boundary = PAGE_SIZE - words.addr() % PAGE_SIZE;
            len = len.min((to_boundary / size).max(1));
        }
        len.min(words.len())
    }

    /// Clock `words` out at `bits_per_word`, segmenting and mapping as needed.
    fn transfer(
        &mut self,
        selector: Selector,
        words: Words<'_>,
        bits_per_word: u8,
        speed_hz: Option<u32>,
    ) -> Result<(), Error> {
        let prefix = self.framing.map(|format| [format.byte(selector, false)]);
        let use_dma = selector.is_data()
            && self.config.dma
            && self.spi.dma_capable()
            && words.byte_len() > self.config.dma_threshold;

        let mut remaining = words;
        while !remaining.is_empty() {
            let mut message: heapless::Vec<Segment<'_>, MAX_SEGMENTS> = heapless::Vec::new();
            let mut mapped: heapless::Vec<DmaHandle, MAX_SEGMENTS> = heapless::Vec::new();

            if let Some(prefix) = prefix.as_ref() {
                let segment = Segment::write(Words::U8(prefix), 8).with_speed(speed_hz);
                message
                    .push(segment)
                    .map_err(|_| Error::ResourceExhausted)?;
            }

            while !message.is_full() && !remaining.is_empty() {
                let (chunk, rest) = remaining.split_at(self.segment_len(&remaining));
                remaining = rest;
                let mut segment = Segment::write(chunk, bits_per_word).with_speed(speed_hz);
                if use_dma {
                    let handle = match self.spi.map_to_device(&chunk) {
                        Ok(handle) => handle,
                        Err(err) => {
                            unmap_all(&mut self.spi, &mut mapped);
                            tracing::warn!(%err, len = chunk.byte_len(), "lcdreg: DMA mapping failed");
                            return Err(Error::Transport(TransportFault::DmaMapping));
                        }
                    };
                    if let Err(handle) = mapped.push(handle) {
                        self.spi.unmap(handle);
                        unmap_all(&mut self.spi, &mut mapped);
                        return Err(Error::ResourceExhausted);
                    }
                    segment.tx_dma = Some(handle);
                }
                if message.push(segment).is_err() {
                    unmap_all(&mut self.spi, &mut mapped);
                    return Err(Error::ResourceExhausted);
                }
            }

            let result = self.spi.transfer(&mut message);
            unmap_all(&mut self.spi, &mut mapped);
            result.map_err(transport(TransportFault::Bus))?;
        }
        Ok(())
    }

    /// Send `words` at `width`, repacking into bytes if the controller
    /// cannot clock that width.
    fn write_words(
        &mut self,
        selector: Selector,
        words: Words<'_>,
        width: Width,
        speed_hz: Option<u32>,
    ) -> Result<(), Error> {
        if self.mask.contains(width) {
            return self.transfer(selector, words, width.bits(), speed_hz);
        }
        match (width, words) {
            (Width::Bits9, Words::U16(src)) => {
                if src.len() % NINE_BIT_GROUP_WORDS != 0 {
                    return Err(Error::InvalidArgument(
                        "9-bit emulation needs a multiple of 8 words",
                    ));
                }
                self.repack(selector, src, NINE_BIT_GROUP_WORDS, NINE_BIT_GROUP_BYTES, speed_hz, pack_9bit)
            }
            (Width::Bits16, Words::U16(src)) => {
                self.repack(selector, src, 1, 2, speed_hz, |s, d| Ok(pack_be16(s, d)))
            }
            (Width::Bits24, Words::U32(src)) => {
                self.repack(selector, src, 1, 3, speed_hz, |s, d| Ok(pack_be24(s, d)))
            }
            (Width::Bits32, Words::U32(src)) => {
                self.repack(selector, src, 1, 4, speed_hz, |s, d| Ok(pack_be32(s, d)))
            }
            _ => Err(Error::InvalidArgument("width cannot be emulated on this bus")),
        }
    }

    /// Pack `src` group by group into the scratch buffer and send it as
    /// bytes, one scratch-full at a time.
    fn repack<T>(
        &mut self,
        selector: Selector,
        src: &[T],
        group_words: usize,
        group_bytes: usize,
        speed_hz: Option<u32>,
        pack: impl Fn(&[T], &mut [u8]) -> Result<usize, Error>,
    ) -> Result<(), Error> {
        let mut scratch = core::mem::take(&mut self.scratch);
        let result =
            self.repack_into(&mut scratch, selector, src, group_words, group_bytes, speed_hz, pack);
        self.scratch = scratch;
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn repack_into<T>(
        &mut self,
        scratch: &mut Scratch<u8>,
        selector: Selector,
        src: &[T],
        group_words: usize,
        group_bytes: usize,
        speed_hz: Option<u32>,
        pack: impl Fn(&[T], &mut [u8]) -> Result<usize, Error>,
    ) -> Result<(), Error> {
        let groups = (self.config.scratch_len / group_bytes).max(1);
        let buf = scratch.get(groups * group_bytes)?;
        for chunk in src.chunks(groups * group_words) {
            let written = pack(chunk, buf)?;
            let packed = buf.get(..written).ok_or(Error::ResourceExhausted)?;
            self.transfer(selector, Words::U8(packed), 8, speed_hz)?;
        }
        Ok(())
    }
}

/// A register transport over SPI.
///
/// `DC` is the data/command line (4-wire only), `RST` the optional reset
/// line.
pub struct SpiTransport<S, DC = NoPin, RST = NoPin> {
    bus: Bus<S>,
    mode: WireMode,
    dc: Option<DC>,
    reset: Option<RST>,
    tags: Scratch<u16>,
}

impl<S: SpiMaster, DC: OutputPin, RST: OutputPin> SpiTransport<S, DC, RST> {
    /// Bind `spi` in `mode`.
    ///
    /// 4-wire mode needs a D/C line. The resolved width mask must include
    /// 8-bit words.
    pub fn new(
        spi: S,
        mode: WireMode,
        dc: Option<DC>,
        reset: Option<RST>,
        config: SpiConfig,
    ) -> Result<Self, Error> {
        if mode == WireMode::FourWire && dc.is_none() {
            return Err(Error::InvalidArgument("4-wire mode needs a D/C line"));
        }
        if config.max_segment_len < 4 || config.scratch_len < MIN_SCRATCH_LEN {
            return Err(Error::InvalidArgument("segment or scratch length too small"));
        }
        let mask = config.bits_per_word_mask.unwrap_or_else(|| {
            match spi.bits_per_word_mask() {
                0 => WidthMask::BITS8_ONLY,
                raw => WidthMask::from_raw(raw),
            }
        });
        if !mask.contains(Width::Bits8) {
            return Err(Error::InvalidArgument("controller cannot send 8-bit words"));
        }
        tracing::debug!(
            mask = mask.raw(),
            max_speed_hz = spi.max_speed_hz(),
            dma = config.dma,
            has_reset = reset.is_some(),
            "lcdreg: SPI transport ready"
        );
        let framing = match mode {
            WireMode::StartByte(format) => Some(format),
            WireMode::FourWire | WireMode::ThreeWire => None,
        };
        Ok(Self {
            bus: Bus {
                spi,
                framing,
                config,
                mask,
                scratch: Scratch::new(),
            },
            mode,
            dc,
            reset,
            tags: Scratch::new(),
        })
    }

    /// 4-wire transport with D/C line `dc`.
    pub fn four_wire(
        spi: S,
        dc: DC,
        reset: Option<RST>,
        config: SpiConfig,
    ) -> Result<Self, Error> {
        Self::new(spi, WireMode::FourWire, Some(dc), reset, config)
    }

    /// Wire mode.
    pub fn mode(&self) -> WireMode {
        self.mode
    }

    /// Word sizes clocked natively.
    pub fn width_mask(&self) -> WidthMask {
        self.bus.mask
    }

    /// Give back the controller and lines.
    pub fn release(self) -> (S, Option<DC>, Option<RST>) {
        (self.bus.spi, self.dc, self.reset)
    }

    fn set_dc(&mut self, selector: Selector) -> Result<(), Error> {
        match self.dc.as_mut() {
            Some(dc) => dc
                .set_state(PinState::from(selector.is_data()))
                .map_err(transport(TransportFault::Gpio)),
            None => Ok(()),
        }
    }

    /// One phase of a write, selector carried the way the wire mode wants.
    fn send(
        &mut self,
        selector: Selector,
        words: Words<'_>,
        width: Width,
        speed_hz: Option<u32>,
    ) -> Result<(), Error> {
        match self.mode {
            WireMode::ThreeWire => self.write_9bit_dc(selector, words, width, speed_hz),
            WireMode::FourWire | WireMode::StartByte(_) => {
                self.set_dc(selector)?;
                self.bus.write_words(selector, words, width, speed_hz)
            }
        }
    }

    /// Tag 8 or 16-bit elements with the selector bit and send them as
    /// 9-bit words.
    ///
    /// Short byte payloads are zero-padded to a whole 9-bit group (padding
    /// before a command, after data). Anything else must tag to a multiple
    /// of eight words unless the controller clocks 9-bit words natively.
    fn write_9bit_dc(
        &mut self,
        selector: Selector,
        words: Words<'_>,
        width: Width,
        speed_hz: Option<u32>,
    ) -> Result<(), Error> {
        let native = self.bus.mask.contains(Width::Bits9);
        let capacity = self.bus.config.scratch_len;
        // whole 9-bit groups per chunk so every chunk packs on its own
        let chunk_words = (capacity / NINE_BIT_GROUP_WORDS * NINE_BIT_GROUP_WORDS).max(NINE_BIT_GROUP_WORDS);
        match (width, words) {
            (Width::Bits8, Words::U8(src)) => {
                let pad = nine_bit_padding(src.len());
                if !native && pad != 0 && src.len() + pad <= capacity {
                    let buf = self.tags.get(src.len() + pad)?;
                    buf.fill(0);
                    let start = if selector.is_data() { 0 } else { pad };
                    let slot = buf
                        .get_mut(start..start + src.len())
                        .ok_or(Error::ResourceExhausted)?;
                    tag_bytes(src, selector, slot);
                    return self.bus.write_words(selector, Words::U16(buf), Width::Bits9, speed_hz);
                }
                if !native && pad != 0 {
                    return Err(Error::InvalidArgument(
                        "9-bit emulation needs a multiple of 8 words",
                    ));
                }
                for chunk in src.chunks(chunk_words) {
                    let buf = self.tags.get(chunk.len())?;
                    let tagged = tag_bytes(chunk, selector, buf);
                    let tagged = buf.get(..tagged).ok_or(Error::ResourceExhausted)?;
                    self.bus.write_words(selector, Words::U16(tagged), Width::Bits9, speed_hz)?;
                }
                Ok(())
            }
            (Width::Bits16, Words::U16(src)) => {
                if !native && nine_bit_padding(src.len() * 2) != 0 {
                    return Err(Error::InvalidArgument(
                        "9-bit emulation needs a multiple of 8 words",
                    ));
                }
                for chunk in src.chunks(chunk_words / 2) {
                    let buf = self.tags.get(chunk.len() * 2)?;
                    let tagged = tag_halfwords(chunk, selector, buf);
                    let tagged = buf.get(..tagged).ok_or(Error::ResourceExhausted)?;
                    self.bus.write_words(selector, Words::U16(tagged), Width::Bits9, speed_hz)?;
                }
                Ok(())
            }
            _ => Err(Error::InvalidArgument("3-wire transfers carry 8 or 16-bit elements")),
        }
    }

    /// Register-select phase at the default width.
    fn select(&mut self, ctx: &BusContext, regnr: u32) -> Result<(), Error> {
        let index = RegisterIndex::new(regnr, ctx.default_width);
        let speed = ctx.write_speed(Selector::Command, self.bus.spi.max_speed_hz());
        self.send(Selector::Command, index.words(), ctx.default_width, speed)
    }

    /// Select phase words for a direct read.
    #[allow(clippy::cast_possible_truncation)] // register numbers are narrowed to the register width
    fn read_select(&self, default_width: Width, regnr: u32) -> Result<ReadSelect, Error> {
        if self.mode == WireMode::ThreeWire {
            if self.bus.mask.contains(Width::Bits9) {
                return Ok(ReadSelect::Native(RegisterIndex::new(regnr & 0xFF, Width::Bits16), 9));
            }
            let mut block = [0u8; NINE_BIT_GROUP_BYTES];
            if let Some(last) = block.last_mut() {
                *last = regnr as u8;
            }
            return ReadSelect::bytes(&block);
        }
        match default_width {
            Width::Bits8 => Ok(ReadSelect::Native(RegisterIndex::new(regnr, Width::Bits8), 8)),
            Width::Bits16 if self.bus.mask.contains(Width::Bits16) => {
                Ok(ReadSelect::Native(RegisterIndex::new(regnr, Width::Bits16), 16))
            }
            Width::Bits16 => ReadSelect::bytes(&(regnr as u16).to_be_bytes()),
            _ => Err(Error::InvalidArgument("reads need an 8 or 16-bit register width")),
        }
    }

    /// Select then read back at the element width, on the slow clock.
    fn read_direct(
        &mut self,
        ctx: &BusContext,
        regnr: u32,
        transfer: &mut ReadTransfer<'_>,
    ) -> Result<(), Error> {
        let width = transfer.width_or(ctx.default_width);
        if width != ctx.default_width {
            return Err(Error::InvalidArgument("read width must match the register width"));
        }
        if !matches!(width, Width::Bits8 | Width::Bits16) {
            return Err(Error::InvalidArgument("reads carry 8 or 16-bit elements"));
        }
        let emulate16 = width == Width::Bits16 && !self.bus.mask.contains(Width::Bits16);
        let speed = Some(slow_speed(self.bus.spi.max_speed_hz()));
        let select = self.read_select(ctx.default_width, regnr)?;
        self.set_dc(Selector::Command)?;

        let mut staging = if emulate16 {
            zeroed::<u8>(transfer.count() * 2)?
        } else {
            alloc::vec::Vec::new()
        };
        let (rx, rx_bits) = if emulate16 {
            (WordsMut::U8(&mut staging), 8)
        } else {
            (transfer.words.reborrow(), width.bits())
        };
        let tx = Segment::write(select.words(), select.bits()).with_speed(speed);
        let rx = Segment::read(rx, rx_bits).with_speed(speed);

        if transfer.selector.is_data() {
            self.bus
                .spi
                .transfer(&mut [tx.with_cs_change()])
                .map_err(transport(TransportFault::Bus))?;
            self.set_dc(Selector::Data)?;
            self.bus
                .spi
                .transfer(&mut [rx])
                .map_err(transport(TransportFault::Bus))?;
        } else {
            self.bus
                .spi
                .transfer(&mut [tx, rx])
                .map_err(transport(TransportFault::Bus))?;
        }

        if let (true, WordsMut::U16(dst)) = (emulate16, &mut transfer.words) {
            unpack_be16(&staging, dst);
        }
        Ok(())
    }

    /// Select, then one message of prefix plus `count * 2 + 1` bytes; the
    /// leading dummy byte is dropped.
    fn read_startbyte(
        &mut self,
        ctx: &BusContext,
        format: StartByte,
        regnr: u32,
        transfer: &mut ReadTransfer<'_>,
    ) -> Result<(), Error> {
        if transfer.width_or(ctx.default_width) != Width::Bits16 {
            return Err(Error::InvalidArgument("startbyte reads are 16-bit"));
        }
        let WordsMut::U16(dst) = &mut transfer.words else {
            return Err(Error::InvalidArgument("element type does not match width"));
        };
        self.select(ctx, regnr)?;

        let speed = Some(slow_speed(self.bus.spi.max_speed_hz()));
        let prefix = [format.byte(transfer.selector, true)];
        let mut rx = zeroed::<u8>(dst.len() * 2 + 1)?;
        self.bus
            .spi
            .transfer(&mut [
                Segment::write(Words::U8(&prefix), 8).with_speed(speed),
                Segment::read(WordsMut::U8(&mut rx), 8).with_speed(speed),
            ])
            .map_err(transport(TransportFault::Bus))?;

        if let Some(payload) = rx.get(1..) {
            unpack_be16(payload, dst);
        }
        Ok(())
    }
}

impl<S: SpiMaster, RST: OutputPin> SpiTransport<S, NoPin, RST> {
    /// 3-wire transport; the selector travels in bit 8.
    pub fn three_wire(spi: S, reset: Option<RST>, config: SpiConfig) -> Result<Self, Error> {
        Self::new(spi, WireMode::ThreeWire, None, reset, config)
    }

    /// Startbyte-framed transport.
    pub fn start_byte(
        spi: S,
        format: StartByte,
        reset: Option<RST>,
        config: SpiConfig,
    ) -> Result<Self, Error> {
        Self::new(spi, WireMode::StartByte(format), None, reset, config)
    }
}

impl<S: SpiMaster, DC: OutputPin, RST: OutputPin> Transport for SpiTransport<S, DC, RST> {
    fn write(
        &mut self,
        ctx: &BusContext,
        regnr: u32,
        transfer: Option<&Transfer<'_>>,
    ) -> Result<(), Error> {
        self.select(ctx, regnr)?;
        let Some(transfer) = transfer.filter(|t| !t.words.is_empty()) else {
            return Ok(());
        };
        let width = transfer.width_or(ctx.default_width);
        let speed = ctx.write_speed(transfer.selector, self.bus.spi.max_speed_hz());
        self.send(transfer.selector, transfer.words, width, speed)
    }

    fn read(
        &mut self,
        ctx: &BusContext,
        regnr: u32,
        transfer: &mut ReadTransfer<'_>,
    ) -> Result<(), Error> {
        match self.mode {
            WireMode::StartByte(format) => self.read_startbyte(ctx, format, regnr, transfer),
            WireMode::FourWire | WireMode::ThreeWire => self.read_direct(ctx, regnr, transfer),
        }
    }

    fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        pulse_reset(self.reset.as_mut(), delay)
    }

    fn readable(&self) -> bool {
        true
    }
}

/// Register word for a read's select phase.
enum ReadSelect {
    /// One word at the given bits per word
    Native(RegisterIndex, u8),
    /// Pre-packed bytes at 8 bits per word
    Bytes(heapless::Vec<u8, NINE_BIT_GROUP_BYTES>),
}

impl ReadSelect {
    fn bytes(bytes: &[u8]) -> Result<Self, Error> {
        heapless::Vec::from_slice(bytes)
            .map(Self::Bytes)
            .map_err(|_| Error::ResourceExhausted)
    }

    fn words(&self) -> Words<'_> {
        match self {
            Self::Native(index, _) => index.words(),
            Self::Bytes(bytes) => Words::U8(bytes),
        }
    }

    fn bits(&self) -> u8 {
        match self {
            Self::Native(_, bits) => *bits,
            Self::Bytes(_) => 8,
        }
    }
}
