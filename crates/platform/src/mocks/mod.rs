//! Mock implementations for testing
//!
//! Recording mocks for the bus traits in this crate. Every mock is a cheap
//! handle over shared state: clone it, move one clone into the code under
//! test and inspect the other afterwards.

#![cfg(any(test, feature = "std"))]

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use embedded_hal::delay::DelayNs;

use crate::dma::{DmaError, DmaHandle, DmaMapper};
use crate::gpio::{DataLine, Direction, ErrorType, InputPin, OutputPin, PinState};
use crate::peripheral::{Segment, SpiMaster};
use crate::words::{Words, WordsMut};

/// Owned copy of a transmitted word slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedWords {
    /// 8-bit elements
    U8(Vec<u8>),
    /// 16-bit elements
    U16(Vec<u16>),
    /// 32-bit elements
    U32(Vec<u32>),
}

impl RecordedWords {
    fn capture(words: &Words<'_>) -> Self {
        match words {
            Words::U8(w) => Self::U8(w.to_vec()),
            Words::U16(w) => Self::U16(w.to_vec()),
            Words::U32(w) => Self::U32(w.to_vec()),
        }
    }

    /// Bytes, if this was an 8-bit slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::U8(w) => Some(w),
            _ => None,
        }
    }

    /// Halfwords, if this was a 16-bit slice.
    pub fn as_halfwords(&self) -> Option<&[u16]> {
        match self {
            Self::U16(w) => Some(w),
            _ => None,
        }
    }
}

/// One segment as the mock saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSegment {
    /// Transmitted data
    pub tx: Option<RecordedWords>,
    /// Number of elements received
    pub rx_len: Option<usize>,
    /// Word size
    pub bits_per_word: u8,
    /// Clock override
    pub speed_hz: Option<u32>,
    /// Chip-select kept asserted
    pub cs_change: bool,
    /// Transmitted through a DMA mapping
    pub dma: bool,
}

/// Error returned by the mocks when a failure was injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

impl embedded_hal::digital::Error for MockError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

#[derive(Debug, Default)]
struct SpiState {
    bits_per_word_mask: u32,
    max_speed_hz: u32,
    messages: Vec<Vec<RecordedSegment>>,
    rx: VecDeque<u32>,
    fail_message: Option<usize>,
    dma_capable: bool,
    fail_map: Option<usize>,
    map_attempts: usize,
    maps: usize,
    unmaps: usize,
}

/// Recording SPI controller.
#[derive(Debug, Clone, Default)]
pub struct MockSpi {
    state: Rc<RefCell<SpiState>>,
}

impl MockSpi {
    /// 8-bit-only controller clocked at `max_speed_hz`.
    pub fn new(max_speed_hz: u32) -> Self {
        let mock = Self::default();
        mock.state.borrow_mut().max_speed_hz = max_speed_hz;
        mock
    }

    /// Advertise a bits-per-word mask.
    #[must_use]
    pub fn with_bits_per_word_mask(self, mask: u32) -> Self {
        self.state.borrow_mut().bits_per_word_mask = mask;
        self
    }

    /// Advertise DMA capability.
    #[must_use]
    pub fn with_dma(self) -> Self {
        self.state.borrow_mut().dma_capable = true;
        self
    }

    /// Make the `n`-th mapping (0-based) fail.
    #[must_use]
    pub fn fail_mapping(self, n: usize) -> Self {
        self.state.borrow_mut().fail_map = Some(n);
        self
    }

    /// Make the `n`-th message (0-based) fail without being recorded.
    #[must_use]
    pub fn fail_message(self, n: usize) -> Self {
        self.state.borrow_mut().fail_message = Some(n);
        self
    }

    /// Queue elements handed out to receive segments, in order.
    pub fn queue_rx(&self, values: &[u32]) {
        self.state.borrow_mut().rx.extend(values.iter().copied());
    }

    /// Every completed message.
    pub fn messages(&self) -> Vec<Vec<RecordedSegment>> {
        self.state.borrow().messages.clone()
    }

    /// All segments of all completed messages, in order.
    pub fn segments(&self) -> Vec<RecordedSegment> {
        self.state.borrow().messages.iter().flatten().cloned().collect()
    }

    /// Number of mappings created.
    pub fn maps(&self) -> usize {
        self.state.borrow().maps
    }

    /// Number of mappings released.
    pub fn unmaps(&self) -> usize {
        self.state.borrow().unmaps
    }
}

impl DmaMapper for MockSpi {
    fn dma_capable(&self) -> bool {
        self.state.borrow().dma_capable
    }

    fn map_to_device(&mut self, words: &Words<'_>) -> Result<DmaHandle, DmaError> {
        let mut state = self.state.borrow_mut();
        let attempt = state.map_attempts;
        state.map_attempts = attempt.saturating_add(1);
        if state.fail_map == Some(attempt) {
            return Err(DmaError::MappingFailed);
        }
        state.maps = state.maps.saturating_add(1);
        Ok(DmaHandle {
            bus_addr: words.addr(),
            len: words.byte_len(),
        })
    }

    fn unmap(&mut self, _handle: DmaHandle) {
        let mut state = self.state.borrow_mut();
        state.unmaps = state.unmaps.saturating_add(1);
    }
}

impl SpiMaster for MockSpi {
    type Error = MockError;

    fn bits_per_word_mask(&self) -> u32 {
        self.state.borrow().bits_per_word_mask
    }

    fn max_speed_hz(&self) -> u32 {
        self.state.borrow().max_speed_hz
    }

    fn transfer(&mut self, message: &mut [Segment<'_>]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_message == Some(state.messages.len()) {
            state.fail_message = None;
            return Err(MockError);
        }
        let mut recorded = Vec::with_capacity(message.len());
        for segment in message.iter_mut() {
            let rx_len = match segment.rx.as_mut() {
                Some(rx) => {
                    for i in 0..rx.len() {
                        let value = state.rx.pop_front().unwrap_or(0);
                        rx.set(i, value);
                    }
                    Some(rx.len())
                }
                None => None,
            };
            recorded.push(RecordedSegment {
                tx: segment.tx.as_ref().map(RecordedWords::capture),
                rx_len,
                bits_per_word: segment.bits_per_word,
                speed_hz: segment.speed_hz,
                cs_change: segment.cs_change,
                dma: segment.tx_dma.is_some(),
            });
        }
        state.messages.push(recorded);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct LineState {
    level: bool,
    input_level: bool,
    direction: Direction,
    writes: usize,
    toggles: usize,
    history: Vec<bool>,
    direction_switches: usize,
    fail_direction: bool,
}

/// Recording GPIO line, usable as output, input or bidirectional data line.
#[derive(Debug, Clone, Default)]
pub struct MockLine {
    state: Rc<RefCell<LineState>>,
}

impl MockLine {
    /// Line starting low, direction unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// `count` independent lines.
    pub fn bank(count: usize) -> Vec<MockLine> {
        (0..count).map(|_| MockLine::new()).collect()
    }

    /// Driven level.
    pub fn level(&self) -> bool {
        self.state.borrow().level
    }

    /// Number of set calls.
    pub fn writes(&self) -> usize {
        self.state.borrow().writes
    }

    /// Number of set calls that changed the level.
    pub fn toggles(&self) -> usize {
        self.state.borrow().toggles
    }

    /// Every level written, in order.
    pub fn history(&self) -> Vec<bool> {
        self.state.borrow().history.clone()
    }

    /// Level reported while the line is an input.
    pub fn set_input_level(&self, high: bool) {
        self.state.borrow_mut().input_level = high;
    }

    /// Current direction.
    pub fn direction(&self) -> Direction {
        self.state.borrow().direction
    }

    /// Number of direction reconfigurations.
    pub fn direction_switches(&self) -> usize {
        self.state.borrow().direction_switches
    }

    /// Make every later direction switch fail.
    pub fn fail_direction_switch(&self) {
        self.state.borrow_mut().fail_direction = true;
    }

    fn drive(&self, high: bool) {
        let mut state = self.state.borrow_mut();
        state.writes = state.writes.saturating_add(1);
        if state.level != high {
            state.toggles = state.toggles.saturating_add(1);
        }
        state.level = high;
        state.history.push(high);
    }

    fn reconfigure(&self, direction: Direction) -> Result<(), MockError> {
        let mut state = self.state.borrow_mut();
        if state.fail_direction {
            return Err(MockError);
        }
        state.direction = direction;
        state.direction_switches = state.direction_switches.saturating_add(1);
        Ok(())
    }
}

impl ErrorType for MockLine {
    type Error = MockError;
}

impl OutputPin for MockLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

impl InputPin for MockLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let state = self.state.borrow();
        Ok(if state.direction == Direction::Input {
            state.input_level
        } else {
            state.level
        })
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl DataLine for MockLine {
    fn set_as_input(&mut self) -> Result<(), Self::Error> {
        self.reconfigure(Direction::Input)
    }

    fn set_as_output(&mut self, initial: PinState) -> Result<(), Self::Error> {
        self.reconfigure(Direction::Output)?;
        self.state.borrow_mut().level = initial == PinState::High;
        Ok(())
    }
}

/// Present `value` on `lines` as input levels, line `n` carrying bit `n`.
pub fn present_bits(lines: &[MockLine], value: u32) {
    for (bit, line) in lines.iter().enumerate() {
        line.set_input_level(crate::gpio::bit_is_set(value, bit));
    }
}

/// Delay that records requested durations instead of sleeping.
#[derive(Debug, Clone, Default)]
pub struct MockDelay {
    waits_ns: Rc<RefCell<Vec<u64>>>,
}

impl MockDelay {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested delays in milliseconds, in order.
    pub fn waits_ms(&self) -> Vec<u64> {
        self.waits_ns.borrow().iter().map(|ns| ns / 1_000_000).collect()
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waits_ns.borrow_mut().push(u64::from(ns));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.waits_ns
            .borrow_mut()
            .push(u64::from(ms).saturating_mul(1_000_000));
    }
}
