//! GPIO and pin abstraction layer
//!
//! Single lines use the `embedded-hal` digital traits directly. Bit-banged
//! data buses additionally need lines whose direction can be flipped at run
//! time, which `embedded-hal` 1.0 leaves out.

use core::convert::Infallible;

pub use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

/// A bidirectional data-bus line.
pub trait DataLine: OutputPin + InputPin {
    /// Release the line and sample it as an input.
    fn set_as_input(&mut self) -> Result<(), Self::Error>;

    /// Drive the line, starting at `initial`.
    fn set_as_output(&mut self, initial: PinState) -> Result<(), Self::Error>;
}

/// Placeholder for an optional line that is not wired.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Data-bus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Unknown, the next switch always reconfigures
    #[default]
    NotSet,
    /// Lines sampled
    Input,
    /// Lines driven
    Output,
}

/// Cached direction of a group of data lines.
///
/// Switching to the direction the group is already in touches no GPIO.
#[derive(Debug, Default)]
pub struct BusDirection {
    current: Direction,
}

impl BusDirection {
    /// Create a cache in the unknown state.
    pub const fn new() -> Self {
        Self {
            current: Direction::NotSet,
        }
    }

    /// Current cached direction.
    pub fn current(&self) -> Direction {
        self.current
    }

    /// Switch every line in `lines` to `direction`.
    ///
    /// Returns `Ok(true)` if the lines were reconfigured. On failure the cache
    /// falls back to [`Direction::NotSet`].
    pub fn switch<L: DataLine>(
        &mut self,
        lines: &mut [L],
        direction: Direction,
    ) -> Result<bool, L::Error> {
        if self.current == direction || direction == Direction::NotSet {
            return Ok(false);
        }
        self.current = Direction::NotSet;
        for line in lines.iter_mut() {
            match direction {
                Direction::Input => line.set_as_input()?,
                Direction::Output => line.set_as_output(PinState::Low)?,
                Direction::NotSet => {}
            }
        }
        self.current = direction;
        Ok(true)
    }
}

/// Drive `lines` so line `n` carries bit `n` of `value`.
pub fn drive_bits<P: OutputPin>(lines: &mut [P], value: u32) -> Result<(), P::Error> {
    for (bit, line) in lines.iter_mut().enumerate() {
        line.set_state(PinState::from(bit_is_set(value, bit)))?;
    }
    Ok(())
}

/// Sample `lines` into a word, line `n` giving bit `n`.
pub fn sample_bits<P: InputPin>(lines: &mut [P]) -> Result<u32, P::Error> {
    let mut value = 0u32;
    for (bit, line) in lines.iter_mut().enumerate().take(32) {
        if line.is_high()? {
            value |= 1 << bit;
        }
    }
    Ok(value)
}

/// True if bit `bit` of `value` is set; bits past 31 read as clear.
pub fn bit_is_set(value: u32, bit: usize) -> bool {
    u32::try_from(bit)
        .ok()
        .and_then(|b| value.checked_shr(b))
        .is_some_and(|v| v & 1 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_is_set_bounds() {
        assert!(bit_is_set(0x8000_0000, 31));
        assert!(!bit_is_set(0xFFFF_FFFF, 32));
        assert!(bit_is_set(0b10, 1));
        assert!(!bit_is_set(0b10, 0));
    }

    #[test]
    fn direction_switch_is_cached() {
        use crate::mocks::MockLine;

        let mut lines = [MockLine::new(), MockLine::new()];
        let probe = lines[0].clone();
        let mut direction = BusDirection::new();

        assert!(direction.switch(&mut lines, Direction::Input).unwrap());
        assert!(!direction.switch(&mut lines, Direction::Input).unwrap());
        assert_eq!(probe.direction_switches(), 1);

        assert!(direction.switch(&mut lines, Direction::Output).unwrap());
        assert_eq!(probe.direction(), Direction::Output);
        assert_eq!(probe.direction_switches(), 2);
    }

    #[test]
    fn failed_switch_forgets_direction() {
        use crate::mocks::MockLine;

        let mut lines = [MockLine::new()];
        lines[0].fail_direction_switch();
        let mut direction = BusDirection::new();
        assert!(direction.switch(&mut lines, Direction::Input).is_err());
        assert_eq!(direction.current(), Direction::NotSet);
    }

    #[test]
    fn drive_and_sample_round_trip() {
        use crate::mocks::MockLine;

        let mut lines = [MockLine::new(), MockLine::new(), MockLine::new()];
        drive_bits(&mut lines, 0b101).unwrap();
        assert!(lines[0].level());
        assert!(!lines[1].level());
        assert_eq!(sample_bits(&mut lines).unwrap(), 0b101);
    }

    #[test]
    fn no_pin_is_infallible() {
        let mut pin = NoPin;
        assert!(pin.set_high().is_ok());
        assert!(pin.set_low().is_ok());
    }
}
