//! Bit-banged master driving the address and data buses from GPIO lines.

use embedded_hal::digital::OutputPin;
use platform::gpio::{drive_bits, sample_bits};
use platform::{BusDirection, DataLine, Direction, Words, WordsMut};

use crate::error::Error;
use crate::master::{word_size_for, I80Master};

/// Widest address or data bus supported.
pub const MAX_BUS_WIDTH: usize = 32;

/// Failure inside [`GpioMaster`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioMasterError {
    /// Setting or sampling a line failed
    Line,
    /// Reconfiguring the data lines failed
    DirectionSwitch,
    /// Element type does not match the data width
    WidthMismatch,
    /// No write strobe
    NotWritable,
    /// No read strobe
    NotReadable,
}

/// I80 master on plain GPIO.
///
/// `A` are the address lines, `L` the bidirectional data lines and `S` the
/// write/read strobes. Line `n` of each bus carries bit `n`.
pub struct GpioMaster<A, L, S> {
    address: heapless::Vec<A, MAX_BUS_WIDTH>,
    data: heapless::Vec<L, MAX_BUS_WIDTH>,
    wr: Option<S>,
    rd: Option<S>,
    curr_address: Option<u32>,
    curr_data: Option<u32>,
    direction: BusDirection,
}

impl<A, L, S> GpioMaster<A, L, S>
where
    A: OutputPin,
    L: DataLine,
    S: OutputPin,
{
    /// Build a master from its lines. At least one strobe and one data line
    /// are required.
    pub fn new(
        address: impl IntoIterator<Item = A>,
        data: impl IntoIterator<Item = L>,
        wr: Option<S>,
        rd: Option<S>,
    ) -> Result<Self, Error> {
        let mut address_lines = heapless::Vec::new();
        for line in address {
            address_lines
                .push(line)
                .map_err(|_| Error::InvalidConfig("more than 32 address lines"))?;
        }
        let mut data_lines = heapless::Vec::new();
        for line in data {
            data_lines
                .push(line)
                .map_err(|_| Error::InvalidConfig("more than 32 data lines"))?;
        }
        if data_lines.is_empty() {
            return Err(Error::InvalidConfig("no data lines"));
        }
        if wr.is_none() && rd.is_none() {
            return Err(Error::InvalidConfig("neither wr nor rd strobe"));
        }
        tracing::debug!(
            address_width = address_lines.len(),
            data_width = data_lines.len(),
            "i80-gpio: master ready"
        );
        Ok(Self {
            address: address_lines,
            data: data_lines,
            wr,
            rd,
            curr_address: None,
            curr_data: None,
            direction: BusDirection::new(),
        })
    }

    fn check_width(&self, element_size: usize) -> Result<(), GpioMasterError> {
        if element_size == word_size_for(self.data_width()) {
            Ok(())
        } else {
            Err(GpioMasterError::WidthMismatch)
        }
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), GpioMasterError> {
        let switched = self
            .direction
            .switch(&mut self.data, direction)
            .map_err(|err| {
                tracing::warn!(?err, "i80-gpio: direction switch failed");
                GpioMasterError::DirectionSwitch
            })?;
        if switched {
            self.curr_data = None;
        }
        Ok(())
    }
}

fn line_error<E: core::fmt::Debug>(err: E) -> GpioMasterError {
    tracing::warn!(?err, "i80-gpio: line access failed");
    GpioMasterError::Line
}

#[allow(clippy::cast_possible_truncation)] // line counts are bounded by MAX_BUS_WIDTH
impl<A, L, S> I80Master for GpioMaster<A, L, S>
where
    A: OutputPin,
    L: DataLine,
    S: OutputPin,
{
    type Error = GpioMasterError;

    fn address_width(&self) -> u8 {
        self.address.len() as u8
    }

    fn data_width(&self) -> u8 {
        self.data.len() as u8
    }

    fn readable(&self) -> bool {
        self.rd.is_some()
    }

    fn writable(&self) -> bool {
        self.wr.is_some()
    }

    fn set_address(&mut self, address: u32) -> Result<(), Self::Error> {
        if self.curr_address == Some(address) {
            return Ok(());
        }
        self.curr_address = None;
        drive_bits(&mut self.address, address).map_err(line_error)?;
        self.curr_address = Some(address);
        Ok(())
    }

    fn write(&mut self, words: Words<'_>) -> Result<(), Self::Error> {
        if self.wr.is_none() {
            return Err(GpioMasterError::NotWritable);
        }
        self.check_width(words.element_size())?;
        self.set_direction(Direction::Output)?;
        self.curr_data = None;
        for value in words.iter() {
            let Some(wr) = self.wr.as_mut() else {
                return Err(GpioMasterError::NotWritable);
            };
            wr.set_low().map_err(line_error)?;
            if self.curr_data != Some(value) {
                self.curr_data = None;
                drive_bits(&mut self.data, value).map_err(line_error)?;
                self.curr_data = Some(value);
            }
            if let Some(wr) = self.wr.as_mut() {
                wr.set_high().map_err(line_error)?;
            }
        }
        Ok(())
    }

    fn read(&mut self, mut words: WordsMut<'_>) -> Result<(), Self::Error> {
        if self.rd.is_none() {
            return Err(GpioMasterError::NotReadable);
        }
        self.check_width(words.element_size())?;
        self.set_direction(Direction::Input)?;
        for index in 0..words.len() {
            let Some(rd) = self.rd.as_mut() else {
                return Err(GpioMasterError::NotReadable);
            };
            rd.set_low().map_err(line_error)?;
            let value = sample_bits(&mut self.data).map_err(line_error)?;
            if let Some(rd) = self.rd.as_mut() {
                rd.set_high().map_err(line_error)?;
            }
            words.set(index, value);
        }
        Ok(())
    }
}
