//! Register console
//!
//! Text front end for poking and peeking registers during bring-up. Input
//! is whitespace separated hex numbers, `0x` prefix optional.
//!
//! - write: `<reg> [<value> ...]`, up to [`MAX_TOKENS`] numbers. Values are
//!   narrowed to the register width.
//! - read: `<reg>`. One element is read and kept as a hex line until the
//!   next read.

use core::fmt::Write as _;

use embedded_hal::delay::DelayNs;
use platform::{Words, WordsMut};

use crate::error::Error;
use crate::register::Lcdreg;
use crate::transfer::{ReadTransfer, Transfer, Width};
use crate::transport::Transport;

/// Most numbers a write line may hold, register included.
pub const MAX_TOKENS: usize = 128;

/// Values of a write line after the register number.
const MAX_VALUES: usize = MAX_TOKENS - 1;

/// Console state: the read width and the last read result.
#[derive(Debug, Default)]
pub struct RegisterConsole {
    read_width: Option<Width>,
    result: Option<heapless::String<12>>,
}

fn parse_tokens(input: &str) -> Result<heapless::Vec<u32, MAX_TOKENS>, Error> {
    let mut tokens = heapless::Vec::new();
    for token in input.split_whitespace() {
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        let value = u32::from_str_radix(digits, 16)
            .map_err(|_| Error::InvalidArgument("not a hex number"))?;
        tokens.push(value).map_err(|_| Error::ResourceExhausted)?;
    }
    if tokens.is_empty() {
        return Err(Error::InvalidArgument("empty command"));
    }
    Ok(tokens)
}

impl RegisterConsole {
    /// Console reading at the register default width.
    pub const fn new() -> Self {
        Self {
            read_width: None,
            result: None,
        }
    }

    /// Width used by reads, `None` for the register default.
    pub fn set_read_width(&mut self, width: Option<Width>) {
        self.read_width = width;
    }

    /// Parse and run a write line.
    #[allow(clippy::cast_possible_truncation)] // values are narrowed to the register width
    pub fn write_command<T: Transport, D: DelayNs>(
        &mut self,
        reg: &mut Lcdreg<T, D>,
        input: &str,
    ) -> Result<(), Error> {
        let tokens = parse_tokens(input)?;
        let Some((&regnr, values)) = tokens.split_first() else {
            return Err(Error::InvalidArgument("empty command"));
        };
        tracing::debug!(regnr, count = values.len(), "lcdreg: console write");
        if values.is_empty() {
            return reg.write(regnr, None);
        }
        let width = reg.default_width();
        match width.bytes_per_word() {
            1 => {
                let staged: heapless::Vec<u8, MAX_VALUES> =
                    values.iter().map(|&v| v as u8).collect();
                reg.write(regnr, Some(&Transfer::data(Words::U8(staged.as_slice()))))
            }
            2 => {
                let staged: heapless::Vec<u16, MAX_VALUES> =
                    values.iter().map(|&v| v as u16).collect();
                reg.write(regnr, Some(&Transfer::data(Words::U16(staged.as_slice()))))
            }
            _ => reg.write(regnr, Some(&Transfer::data(Words::U32(values)))),
        }
    }

    /// Parse and run a read line, keeping the formatted result.
    pub fn read_command<T: Transport, D: DelayNs>(
        &mut self,
        reg: &mut Lcdreg<T, D>,
        input: &str,
    ) -> Result<(), Error> {
        let tokens = parse_tokens(input)?;
        let [regnr] = tokens.as_slice() else {
            return Err(Error::InvalidArgument("read takes one register number"));
        };
        let width = self.read_width.unwrap_or_else(|| reg.default_width());
        let selector = reg.quirks().read_selector();
        self.result = None;

        let mut word = [0u32; 1];
        let mut half = [0u16; 1];
        let mut byte = [0u8; 1];
        let words = match width.bytes_per_word() {
            1 => WordsMut::U8(&mut byte),
            2 => WordsMut::U16(&mut half),
            _ => WordsMut::U32(&mut word),
        };
        let mut transfer = ReadTransfer::data(words)
            .with_selector(selector)
            .with_width(width);
        reg.read(*regnr, &mut transfer)?;
        drop(transfer);

        let mut line = heapless::String::new();
        let formatted = match width {
            Width::Bits8 => writeln!(line, "{:02x}", byte[0]),
            Width::Bits9 | Width::Bits16 => writeln!(line, "{:04x}", half[0]),
            Width::Bits24 | Width::Bits32 => writeln!(line, "{:08x}", word[0]),
        };
        formatted.map_err(|_| Error::ResourceExhausted)?;
        tracing::debug!(regnr, "lcdreg: console read");
        self.result = Some(line);
        Ok(())
    }

    /// Result of the last successful read.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }
}
