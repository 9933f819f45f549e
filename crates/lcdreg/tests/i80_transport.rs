//! I80 transport tests: two controllers sharing one master.
//!
//! Run with: cargo test -p lcdreg --test i80_transport
// Test file: expect/unwrap are intentional test mechanisms.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use i80::mock::{BusOp, MockI80Master};
use i80::{I80Bus, SharedI80Bus};
use lcdreg::{Error, I80Transport, Lcdreg, Quirks, RegisterConfig, Transfer, Width};
use platform::mocks::MockDelay;
use platform::NoPin;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Bus = SharedI80Bus<NoopRawMutex, MockI80Master>;

fn bus(master: &MockI80Master) -> Bus {
    SharedI80Bus::new(I80Bus::new(master.clone()))
}

// ---------------------------------------------------------------------------
// Test: sharing
// ---------------------------------------------------------------------------

/// Each controller's accesses land in its own window and end with the
/// latch back at 0.
#[test]
fn test_two_panels_on_one_master() {
    let master = MockI80Master::new(4, 8);
    let bus = bus(&master);
    let left = I80Transport::<_, _, NoPin>::attach(&bus, 0x0, 2, None).unwrap();
    let right = I80Transport::<_, _, NoPin>::attach(&bus, 0x2, 2, None).unwrap();
    let mut left = Lcdreg::new(left, MockDelay::new(), RegisterConfig::new(Width::Bits8)).unwrap();
    let mut right =
        Lcdreg::new(right, MockDelay::new(), RegisterConfig::new(Width::Bits8)).unwrap();

    left.write_u32(0x29, &[]).unwrap();
    right.write_u32(0x3A, &[0x55]).unwrap();

    assert_eq!(
        master.ops(),
        [
            BusOp::SetAddress(0x0),
            BusOp::Write(vec![0x29]),
            BusOp::SetAddress(0),
            BusOp::SetAddress(0x2),
            BusOp::Write(vec![0x3A]),
            BusOp::SetAddress(0x3),
            BusOp::Write(vec![0x55]),
            BusOp::SetAddress(0),
        ]
    );
}

/// Overlapping windows are refused at attach time.
#[test]
fn test_overlapping_panels_conflict() {
    let master = MockI80Master::new(4, 8);
    let bus = bus(&master);
    let _first = I80Transport::<_, _, NoPin>::attach(&bus, 0x0, 4, None).unwrap();
    assert!(matches!(
        I80Transport::<_, _, NoPin>::attach(&bus, 0x2, 2, None),
        Err(Error::AddressConflict)
    ));
}

// ---------------------------------------------------------------------------
// Test: data phases
// ---------------------------------------------------------------------------

/// 24-bit pixels on a 16-bit bus do not split evenly and are refused before
/// anything is latched for the data phase.
#[test]
fn test_uneven_split_is_rejected() {
    let master = MockI80Master::new(4, 16);
    let bus = bus(&master);
    let transport = I80Transport::<_, _, NoPin>::attach(&bus, 0, 2, None).unwrap();
    let mut reg =
        Lcdreg::new(transport, MockDelay::new(), RegisterConfig::new(Width::Bits16)).unwrap();

    let pixels = [0x00FF_FFFFu32];
    let transfer = Transfer::data(&pixels[..]).with_width(Width::Bits24);
    assert!(matches!(
        reg.write(0x2C, Some(&transfer)),
        Err(Error::InvalidArgument(_))
    ));
    assert!(!master
        .ops()
        .iter()
        .any(|op| matches!(op, BusOp::SetAddress(1))));
}

/// With the read quirk the data phase is read at the command address.
#[test]
fn test_read_selector_quirk() {
    let master = MockI80Master::new(4, 8);
    master.queue_rx(&[0x9C]);
    let bus = bus(&master);
    let transport = I80Transport::<_, _, NoPin>::attach(&bus, 0x4, 4, None).unwrap();
    let config = RegisterConfig::new(Width::Bits8)
        .readable()
        .with_quirks(Quirks::INDEX0_ON_READ);
    let mut reg = Lcdreg::new(transport, MockDelay::new(), config).unwrap();

    let mut out = [0u32; 1];
    reg.read_u32(0x0A, &mut out).unwrap();
    assert_eq!(out, [0x9C]);
    assert_eq!(
        master.ops(),
        [
            BusOp::SetAddress(0x4),
            BusOp::Write(vec![0x0A]),
            BusOp::SetAddress(0x4),
            BusOp::Read(1),
            BusOp::SetAddress(0),
        ]
    );
}
