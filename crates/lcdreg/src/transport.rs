//! Bus driver contract
//!
//! Each physical bus kind implements [`Transport`]. The register interface
//! validates descriptors before calling in, so a transport receives only
//! non-empty data phases whose element type matches the resolved width.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::{Quirks, SLOW_CLOCK_HZ};
use crate::error::{transport, Error, TransportFault};
use crate::transfer::{ReadTransfer, Selector, Transfer, Width};

/// Reset pulse width.
pub const RESET_PULSE_MS: u32 = 20;

/// Time the controller needs after reset before accepting commands.
pub const RESET_SETTLE_MS: u32 = 120;

/// Register interface settings a transport needs per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusContext {
    /// Width register numbers are sent at
    pub default_width: Width,
    /// Protocol quirks
    pub quirks: Quirks,
}

impl BusContext {
    /// Clock override for a transfer in `selector` phase on a bus with
    /// maximum clock `max_speed_hz`.
    pub fn write_speed(&self, selector: Selector, max_speed_hz: u32) -> Option<u32> {
        (selector == Selector::Command && self.quirks.contains(Quirks::SLOW_INDEX0_WRITE))
            .then(|| slow_speed(max_speed_hz))
    }
}

/// min(2 MHz, half the maximum clock)
pub fn slow_speed(max_speed_hz: u32) -> u32 {
    SLOW_CLOCK_HZ.min(max_speed_hz / 2)
}

/// A physical bus able to carry register accesses.
pub trait Transport {
    /// Send `regnr` at the default width, then the data phase if any.
    fn write(
        &mut self,
        ctx: &BusContext,
        regnr: u32,
        transfer: Option<&Transfer<'_>>,
    ) -> Result<(), Error>;

    /// Send `regnr`, then read the data phase into `transfer`.
    fn read(
        &mut self,
        ctx: &BusContext,
        regnr: u32,
        transfer: &mut ReadTransfer<'_>,
    ) -> Result<(), Error>;

    /// Pulse the reset line, if one is wired.
    fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error>;

    /// Whether the wiring can read back at all.
    fn readable(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(
        &mut self,
        ctx: &BusContext,
        regnr: u32,
        transfer: Option<&Transfer<'_>>,
    ) -> Result<(), Error> {
        T::write(self, ctx, regnr, transfer)
    }

    fn read(
        &mut self,
        ctx: &BusContext,
        regnr: u32,
        transfer: &mut ReadTransfer<'_>,
    ) -> Result<(), Error> {
        T::read(self, ctx, regnr, transfer)
    }

    fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        T::reset(self, delay)
    }

    fn readable(&self) -> bool {
        T::readable(self)
    }
}

/// Drive `line` low for [`RESET_PULSE_MS`], release it and wait
/// [`RESET_SETTLE_MS`]. Does nothing without a line.
pub fn pulse_reset<P: OutputPin, D: DelayNs>(
    line: Option<&mut P>,
    delay: &mut D,
) -> Result<(), Error> {
    let Some(line) = line else {
        return Ok(());
    };
    tracing::debug!("lcdreg: reset");
    line.set_low().map_err(transport(TransportFault::Gpio))?;
    delay.delay_ms(RESET_PULSE_MS);
    line.set_high().map_err(transport(TransportFault::Gpio))?;
    delay.delay_ms(RESET_SETTLE_MS);
    Ok(())
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use platform::mocks::MockDelay;
    use platform::NoPin;

    use super::*;

    #[test]
    fn reset_pulses_and_settles() {
        let mut pin = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let mut delay = MockDelay::new();
        pulse_reset(Some(&mut pin), &mut delay).unwrap();
        assert_eq!(delay.waits_ms(), [20, 120]);
        pin.done();
    }

    #[test]
    fn reset_without_line_is_noop() {
        let mut delay = MockDelay::new();
        pulse_reset::<NoPin, _>(None, &mut delay).unwrap();
        assert!(delay.waits_ms().is_empty());
    }

    #[test]
    fn slow_speed_is_capped() {
        assert_eq!(slow_speed(32_000_000), 2_000_000);
        assert_eq!(slow_speed(3_000_000), 1_500_000);
    }

    #[test]
    fn only_command_phase_is_slowed() {
        let ctx = BusContext {
            default_width: Width::Bits8,
            quirks: Quirks::SLOW_INDEX0_WRITE,
        };
        assert_eq!(ctx.write_speed(Selector::Command, 10_000_000), Some(2_000_000));
        assert_eq!(ctx.write_speed(Selector::Data, 10_000_000), None);
    }
}
