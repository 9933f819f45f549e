//! SPI wire-level tests: what a controller actually sees on MOSI for each
//! wire mode.
//!
//! Run with: cargo test -p lcdreg --test spi_wire
// Test file: expect/unwrap are intentional test mechanisms.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use lcdreg::{
    writereg, Error, Lcdreg, Quirks, RegisterConfig, SpiConfig, SpiTransport, StartByte,
    Transfer, Width,
};
use platform::mocks::{MockDelay, MockLine, MockSpi, RecordedSegment};
use platform::NoPin;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn bytes(segment: &RecordedSegment) -> Vec<u8> {
    segment
        .tx
        .as_ref()
        .and_then(|tx| tx.as_bytes())
        .expect("8-bit transmit segment")
        .to_vec()
}

fn four_wire(
    spi: &MockSpi,
    config: RegisterConfig,
) -> (Lcdreg<SpiTransport<MockSpi, MockLine, NoPin>, MockDelay>, MockLine) {
    let dc = MockLine::new();
    let transport =
        SpiTransport::four_wire(spi.clone(), dc.clone(), None, SpiConfig::default()).unwrap();
    (Lcdreg::new(transport, MockDelay::new(), config).unwrap(), dc)
}

// ---------------------------------------------------------------------------
// Test: 4-wire
// ---------------------------------------------------------------------------

/// 16-bit registers on an 8-bit controller go out big-endian.
#[test]
fn test_16bit_register_on_8bit_controller() {
    let spi = MockSpi::new(32_000_000);
    let (mut reg, dc) = four_wire(&spi, RegisterConfig::new(Width::Bits16));

    let values = [0u16, 0];
    reg.write(0x20, Some(&Transfer::data(&values[..]).with_width(Width::Bits16)))
        .unwrap();

    let segments = spi.segments();
    assert_eq!(segments.len(), 2);
    assert_eq!(bytes(&segments[0]), [0x00, 0x20]);
    assert_eq!(bytes(&segments[1]), [0, 0, 0, 0]);
    assert!(segments.iter().all(|s| s.bits_per_word == 8));
    // D/C low for the register, high for the data
    assert_eq!(dc.history(), [false, true]);
}

/// The macro form narrows inline values to the register width.
#[test]
fn test_writereg_sends_inline_values() {
    let spi = MockSpi::new(32_000_000);
    let (mut reg, _dc) = four_wire(&spi, RegisterConfig::new(Width::Bits8));

    writereg!(reg, 0x2A, 0x00, 0x00, 0x00, 0xEF).unwrap();

    let segments = spi.segments();
    assert_eq!(bytes(&segments[0]), [0x2A]);
    assert_eq!(bytes(&segments[1]), [0x00, 0x00, 0x00, 0xEF]);
}

/// With the slow-index quirk the register phase carries a clock override and
/// the data phase does not.
#[test]
fn test_slow_register_phase() {
    let spi = MockSpi::new(10_000_000);
    let config = RegisterConfig::new(Width::Bits8).with_quirks(Quirks::SLOW_INDEX0_WRITE);
    let (mut reg, _dc) = four_wire(&spi, config);

    let data = [0x55u8];
    reg.write(0x3A, Some(&Transfer::data(&data[..]))).unwrap();

    let segments = spi.segments();
    assert_eq!(segments[0].speed_hz, Some(2_000_000));
    assert_eq!(segments[1].speed_hz, None);
}

/// A failing controller surfaces as a transport error and sends nothing
/// further.
#[test]
fn test_controller_failure_stops_the_access() {
    let spi = MockSpi::new(10_000_000).fail_message(0);
    let (mut reg, _dc) = four_wire(&spi, RegisterConfig::new(Width::Bits8));

    let data = [1u8, 2];
    assert!(matches!(
        reg.write(0x2C, Some(&Transfer::data(&data[..]))),
        Err(Error::Transport(_))
    ));
    assert!(spi.messages().is_empty());
}

// ---------------------------------------------------------------------------
// Test: 3-wire
// ---------------------------------------------------------------------------

/// Without 9-bit support, the register byte is padded in front and data
/// behind, each group packed into nine bytes.
#[test]
fn test_three_wire_packs_padded_groups() {
    let spi = MockSpi::new(10_000_000);
    let transport =
        SpiTransport::<_, NoPin, NoPin>::three_wire(spi.clone(), None, SpiConfig::default())
            .unwrap();
    let mut reg =
        Lcdreg::new(transport, MockDelay::new(), RegisterConfig::new(Width::Bits8)).unwrap();

    let data = [1u8, 2, 3, 4];
    reg.write(0x2A, Some(&Transfer::data(&data[..]))).unwrap();

    let segments = spi.segments();
    assert_eq!(segments.len(), 2);
    assert_eq!(bytes(&segments[0]), [0, 0, 0, 0, 0, 0, 0, 0, 0x2A]);
    assert_eq!(bytes(&segments[1]), [0x80, 0xC0, 0xA0, 0x70, 0x40, 0, 0, 0, 0]);
}

/// A controller with 9-bit words gets the tagged words directly.
#[test]
fn test_three_wire_native_nine_bit() {
    let mask = platform::bpw_mask(8) | platform::bpw_mask(9);
    let spi = MockSpi::new(10_000_000).with_bits_per_word_mask(mask);
    let transport =
        SpiTransport::<_, NoPin, NoPin>::three_wire(spi.clone(), None, SpiConfig::default())
            .unwrap();
    let mut reg =
        Lcdreg::new(transport, MockDelay::new(), RegisterConfig::new(Width::Bits8)).unwrap();

    let data = [0xABu8];
    reg.write(0x36, Some(&Transfer::data(&data[..]))).unwrap();

    let segments = spi.segments();
    assert!(segments.iter().all(|s| s.bits_per_word == 9));
    assert_eq!(
        segments[0].tx.as_ref().and_then(|tx| tx.as_halfwords()),
        Some(&[0x036][..])
    );
    assert_eq!(
        segments[1].tx.as_ref().and_then(|tx| tx.as_halfwords()),
        Some(&[0x1AB][..])
    );
}

// ---------------------------------------------------------------------------
// Test: startbyte
// ---------------------------------------------------------------------------

/// Every message opens with the prefix for its phase.
#[test]
fn test_startbyte_prefixes_each_phase() {
    let spi = MockSpi::new(10_000_000);
    let transport = SpiTransport::<_, NoPin, NoPin>::start_byte(
        spi.clone(),
        StartByte::Standard { id: false },
        None,
        SpiConfig::default(),
    )
    .unwrap();
    let mut reg =
        Lcdreg::new(transport, MockDelay::new(), RegisterConfig::new(Width::Bits16)).unwrap();

    let data = [0x1234u16];
    reg.write(0x22, Some(&Transfer::data(&data[..]))).unwrap();

    let messages = spi.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(bytes(&messages[0][0]), [0x70]);
    assert_eq!(bytes(&messages[0][1]), [0x00, 0x22]);
    assert_eq!(bytes(&messages[1][0]), [0x72]);
    assert_eq!(bytes(&messages[1][1]), [0x12, 0x34]);
}

/// Startbyte reads drop the dummy byte clocked before the payload.
#[test]
fn test_startbyte_read_skips_dummy() {
    let spi = MockSpi::new(10_000_000);
    let transport = SpiTransport::<_, NoPin, NoPin>::start_byte(
        spi.clone(),
        StartByte::Standard { id: false },
        None,
        SpiConfig::default(),
    )
    .unwrap();
    let mut reg = Lcdreg::new(
        transport,
        MockDelay::new(),
        RegisterConfig::new(Width::Bits16).readable(),
    )
    .unwrap();

    spi.queue_rx(&[0xFF, 0x93, 0x25]);
    let mut out = [0u32; 1];
    reg.read_u32(0x00, &mut out).unwrap();
    assert_eq!(out, [0x9325]);

    let last = spi.messages().pop().unwrap();
    assert_eq!(bytes(&last[0]), [0x73]);
    assert_eq!(last[1].rx_len, Some(3));
}

// ---------------------------------------------------------------------------
// Test: reset
// ---------------------------------------------------------------------------

/// Reset drives the line low for 20 ms and waits 120 ms after release.
#[test]
fn test_reset_line_timing() {
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    let spi = MockSpi::new(10_000_000);
    let mut rst = PinMock::new(&[Transaction::set(State::Low), Transaction::set(State::High)]);
    let delay = MockDelay::new();
    let transport = SpiTransport::<_, NoPin, _>::three_wire(
        spi.clone(),
        Some(rst.clone()),
        SpiConfig::default(),
    )
    .unwrap();
    let mut reg =
        Lcdreg::new(transport, delay.clone(), RegisterConfig::new(Width::Bits8)).unwrap();

    reg.reset().unwrap();
    assert_eq!(delay.waits_ms(), [20, 120]);
    assert!(spi.messages().is_empty());
    rst.done();
}
