//! MIPI-DBI controllers
//!
//! Controllers following the MIPI Display Command Set take pixels through
//! an address window:
//!
//! ```text
//! 0x2A SET_COLUMN_ADDRESS  xs[15:8] xs[7:0] xe[15:8] xe[7:0]
//! 0x2B SET_PAGE_ADDRESS    ys[15:8] ys[7:0] ye[15:8] ye[7:0]
//! 0x2C WRITE_MEMORY_START  pixels...
//! ```
//!
//! The three writes must not interleave with another context's accesses,
//! so [`MipiDbi::update`] runs them under one [`SharedLcdreg`] lock.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use lcdreg::{writereg, Lcdreg, SharedLcdreg, Transport, Width};

use crate::config::DisplayConfig;
use crate::error::Error;
use crate::format::PixelFormat;
use crate::framebuffer::Framebuffer;

/// Set column address.
pub const SET_COLUMN_ADDRESS: u32 = 0x2A;
/// Set page address.
pub const SET_PAGE_ADDRESS: u32 = 0x2B;
/// Write memory start.
pub const WRITE_MEMORY_START: u32 = 0x2C;
/// Set address mode.
pub const SET_ADDRESS_MODE: u32 = 0x36;
/// Set pixel format.
pub const SET_PIXEL_FORMAT: u32 = 0x3A;
/// Get diagnostic result.
pub const GET_DIAGNOSTIC_RESULT: u32 = 0x0F;

/// Register width MIPI-DBI controllers use unless configured otherwise.
pub const DEFAULT_REGISTER_WIDTH: Width = Width::Bits8;

/// BGR order bit of the address mode register.
const ADDRESS_MODE_BGR: u8 = 1 << 3;

/// Diagnostic bits that must read back set; chip attachment and glass break
/// detection are optional.
const DIAGNOSTIC_REQUIRED: u32 = 0b1100_0000;

/// Address mode register values for each rotation, BGR bit excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressModes {
    /// 0 degrees
    pub deg0: u8,
    /// 90 degrees
    pub deg90: u8,
    /// 180 degrees
    pub deg180: u8,
    /// 270 degrees
    pub deg270: u8,
}

impl AddressModes {
    fn as_array(self) -> [u8; 4] {
        [self.deg0, self.deg90, self.deg180, self.deg270]
    }
}

/// A MIPI-DBI panel: its video memory and addressing.
#[derive(Debug)]
pub struct MipiDbi {
    config: DisplayConfig,
    framebuffer: Framebuffer,
    address_modes: [u8; 4],
}

/// Big-endian halves of a window bound.
const fn split(value: u32) -> [u32; 2] {
    [(value >> 8) & 0xFF, value & 0xFF]
}

impl MipiDbi {
    /// Panel described by `config`, with controller `address_modes`.
    ///
    /// Rgb888 video memory is in BGR byte order on little-endian hosts, so
    /// the controller's BGR bit is flipped for it there.
    pub fn new(config: DisplayConfig, address_modes: AddressModes) -> Result<Self, Error> {
        let framebuffer = Framebuffer::new(&config)?;
        let mut bgr = config.bgr;
        if cfg!(target_endian = "little") && config.format == PixelFormat::Rgb888 {
            bgr = !bgr;
        }
        let bgr_bit = if bgr { ADDRESS_MODE_BGR } else { 0 };
        let address_modes = address_modes.as_array().map(|mode| mode | bgr_bit);
        tracing::debug!(bgr, format = config.format.as_str(), "fbdbi: MIPI-DBI panel");
        Ok(Self {
            config,
            framebuffer,
            address_modes,
        })
    }

    /// Display settings.
    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Register interface settings: 8-bit registers unless overridden.
    pub fn register_config(&self) -> lcdreg::RegisterConfig {
        self.config.register_config(DEFAULT_REGISTER_WIDTH)
    }

    /// Video memory.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Video memory, for drawing.
    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    /// Address mode register value for the configured rotation.
    pub fn address_mode(&self) -> u8 {
        self.address_modes
            .get(self.config.rotation.index())
            .copied()
            .unwrap_or_default()
    }

    /// Flush lines `ys..=ye`: full-width window, then the pixels.
    pub fn update<R: RawMutex, T: Transport, D: DelayNs>(
        &self,
        reg: &SharedLcdreg<R, T, D>,
        ys: u32,
        ye: u32,
    ) -> Result<(), Error> {
        reg.lock(|reg| self.update_locked(reg, ys, ye))
    }

    /// [`MipiDbi::update`] for a caller already holding the register.
    pub fn update_locked<T: Transport, D: DelayNs>(
        &self,
        reg: &mut Lcdreg<T, D>,
        ys: u32,
        ye: u32,
    ) -> Result<(), Error> {
        if ys > ye || ye >= self.framebuffer.yres() {
            return Err(Error::InvalidLineRange { ys, ye });
        }
        let xe = self.framebuffer.xres().saturating_sub(1);
        let [xs_hi, xs_lo] = split(0);
        let [xe_hi, xe_lo] = split(xe);
        let [ys_hi, ys_lo] = split(ys);
        let [ye_hi, ye_lo] = split(ye);
        tracing::trace!(ys, ye, xe, "fbdbi: MIPI-DBI window");
        writereg!(reg, SET_COLUMN_ADDRESS, xs_hi, xs_lo, xe_hi, xe_lo)?;
        writereg!(reg, SET_PAGE_ADDRESS, ys_hi, ys_lo, ye_hi, ye_lo)?;
        self.framebuffer.update(reg, WRITE_MEMORY_START, ys, ye)
    }

    /// Program the controller's interface pixel format.
    pub fn set_pixel_format<T: Transport, D: DelayNs>(
        &self,
        reg: &mut Lcdreg<T, D>,
    ) -> Result<(), Error> {
        let value = match self.config.format {
            PixelFormat::Rgb565 => 0x05,
            PixelFormat::Rgb888 | PixelFormat::Xrgb8888 => 0x06,
            PixelFormat::Mono01 => return Err(Error::UnsupportedFormat),
        };
        writereg!(reg, SET_PIXEL_FORMAT, value)?;
        Ok(())
    }

    /// Program the address mode for the configured rotation.
    pub fn set_address_mode<T: Transport, D: DelayNs>(
        &self,
        reg: &mut Lcdreg<T, D>,
    ) -> Result<(), Error> {
        writereg!(reg, SET_ADDRESS_MODE, u32::from(self.address_mode()))?;
        Ok(())
    }

    /// Pixel format then address mode, under one lock.
    pub fn configure<R: RawMutex, T: Transport, D: DelayNs>(
        &self,
        reg: &SharedLcdreg<R, T, D>,
    ) -> Result<(), Error> {
        reg.lock(|reg| {
            self.set_pixel_format(reg)?;
            self.set_address_mode(reg)
        })
    }
}

/// Read the diagnostic result register and check it.
///
/// Returns `Ok(false)` when the controller answers but reports a fault, or
/// does not answer at all.
pub fn read_diagnostics<T: Transport, D: DelayNs>(reg: &mut Lcdreg<T, D>) -> Result<bool, Error> {
    let mut value = [0u32; 1];
    if let Err(err) = reg.read_u32(GET_DIAGNOSTIC_RESULT, &mut value) {
        tracing::warn!(%err, "fbdbi: failed to read from controller");
        return match err {
            lcdreg::Error::NotReadable => Err(Error::Register(err)),
            _ => Ok(false),
        };
    }
    let [result] = value;
    if result & DIAGNOSTIC_REQUIRED != DIAGNOSTIC_REQUIRED {
        tracing::warn!(result, "fbdbi: controller diagnostics failed");
        return Ok(false);
    }
    tracing::debug!(result, "fbdbi: controller diagnostics ok");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use lcdreg::{SpiConfig, SpiTransport};
    use platform::mocks::{MockDelay, MockLine, MockSpi};
    use platform::NoPin;

    use super::*;
    use crate::config::Rotation;

    type TestReg = Lcdreg<SpiTransport<MockSpi, MockLine, NoPin>, MockDelay>;

    const MODES: AddressModes = AddressModes {
        deg0: 0x40,
        deg90: 0x20,
        deg180: 0x80,
        deg270: 0xE0,
    };

    fn reg(spi: &MockSpi, panel: &MipiDbi) -> TestReg {
        let transport =
            SpiTransport::four_wire(spi.clone(), MockLine::new(), None, SpiConfig::default())
                .unwrap();
        Lcdreg::new(transport, MockDelay::new(), panel.register_config()).unwrap()
    }

    fn tx_bytes(spi: &MockSpi) -> Vec<Vec<u8>> {
        spi.segments()
            .iter()
            .filter_map(|s| s.tx.as_ref().and_then(|tx| tx.as_bytes()).map(<[u8]>::to_vec))
            .collect()
    }

    #[test]
    fn update_sets_window_then_writes() {
        let panel = MipiDbi::new(DisplayConfig::new(320, 240), MODES).unwrap();
        let spi = MockSpi::new(32_000_000);
        let shared: SharedLcdreg<NoopRawMutex, _, _> = SharedLcdreg::new(reg(&spi, &panel));

        panel.update(&shared, 10, 11).unwrap();

        let bytes = tx_bytes(&spi);
        assert_eq!(bytes[0], [0x2A]);
        assert_eq!(bytes[1], [0x00, 0x00, 0x01, 0x3F]);
        assert_eq!(bytes[2], [0x2B]);
        assert_eq!(bytes[3], [0x00, 0x0A, 0x00, 0x0B]);
        assert_eq!(bytes[4], [0x2C]);
        // 2 lines of 320 rgb565 pixels, big-endian on an 8-bit controller
        assert_eq!(bytes[5].len(), 2 * 320 * 2);
    }

    #[test]
    fn update_rejects_lines_past_the_end() {
        let panel = MipiDbi::new(DisplayConfig::new(320, 240), MODES).unwrap();
        let spi = MockSpi::new(32_000_000);
        let mut reg = reg(&spi, &panel);
        assert_eq!(
            panel.update_locked(&mut reg, 0, 240),
            Err(Error::InvalidLineRange { ys: 0, ye: 240 })
        );
        assert!(spi.segments().is_empty());
    }

    #[test]
    fn pixel_format_values() {
        let spi = MockSpi::new(32_000_000);
        for (format, expected) in [(PixelFormat::Rgb565, 0x05), (PixelFormat::Xrgb8888, 0x06)] {
            let config = DisplayConfig {
                format,
                ..DisplayConfig::new(8, 8)
            };
            let panel = MipiDbi::new(config, MODES).unwrap();
            let mut reg = reg(&spi, &panel);
            panel.set_pixel_format(&mut reg).unwrap();
            assert_eq!(tx_bytes(&spi).last(), Some(&vec![expected]));
        }

        let mono = DisplayConfig {
            format: PixelFormat::Mono01,
            ..DisplayConfig::new(8, 8)
        };
        let panel = MipiDbi::new(mono, MODES).unwrap();
        let mut reg = reg(&spi, &panel);
        assert_eq!(panel.set_pixel_format(&mut reg), Err(Error::UnsupportedFormat));
    }

    #[test]
    fn address_mode_follows_rotation_and_bgr() {
        let config = DisplayConfig {
            rotation: Rotation::Deg270,
            bgr: true,
            ..DisplayConfig::new(240, 320)
        };
        let panel = MipiDbi::new(config, MODES).unwrap();
        assert_eq!(panel.address_mode(), 0xE8);

        let config = DisplayConfig {
            rotation: Rotation::Deg90,
            ..DisplayConfig::new(240, 320)
        };
        let panel = MipiDbi::new(config, MODES).unwrap();
        assert_eq!(panel.address_mode(), 0x20);
        assert_eq!(panel.framebuffer().xres(), 320);
    }

    #[test]
    fn rgb888_flips_bgr_on_little_endian() {
        let config = DisplayConfig {
            format: PixelFormat::Rgb888,
            ..DisplayConfig::new(8, 8)
        };
        let panel = MipiDbi::new(config, MODES).unwrap();
        let expected = if cfg!(target_endian = "little") { 0x48 } else { 0x40 };
        assert_eq!(panel.address_mode(), expected);
    }

    #[test]
    fn configure_writes_format_then_mode() {
        let panel = MipiDbi::new(DisplayConfig::new(8, 8), MODES).unwrap();
        let spi = MockSpi::new(32_000_000);
        let shared: SharedLcdreg<NoopRawMutex, _, _> = SharedLcdreg::new(reg(&spi, &panel));
        panel.configure(&shared).unwrap();
        assert_eq!(tx_bytes(&spi), [vec![0x3A], vec![0x05], vec![0x36], vec![0x40]]);
    }

    #[test]
    fn diagnostics() {
        let panel = MipiDbi::new(DisplayConfig::new(8, 8), MODES).unwrap();
        let spi = MockSpi::new(32_000_000);
        let transport =
            SpiTransport::<_, MockLine, NoPin>::four_wire(spi.clone(), MockLine::new(), None, SpiConfig::default())
                .unwrap();
        let config = panel.register_config().readable();
        let mut readable = Lcdreg::new(transport, MockDelay::new(), config).unwrap();

        spi.queue_rx(&[0xC0]);
        assert_eq!(read_diagnostics(&mut readable), Ok(true));
        spi.queue_rx(&[0x80]);
        assert_eq!(read_diagnostics(&mut readable), Ok(false));

        let mut write_only = reg(&spi, &panel);
        assert!(read_diagnostics(&mut write_only).is_err());
    }
}
