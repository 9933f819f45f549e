//! I80 bus transport
//!
//! Register numbers go out at address 0 of the device window and data
//! phases at address 0 (command selector) or 1 (data selector). Each access
//! runs inside one bus session, so the register and data phases are never
//! split by another device on the same master.
//!
//! Elements narrower than the data bus are widened; wider ones are cut into
//! bus words, most significant first, through a small staging buffer.

use ::i80::{word_size_for, DeviceId, I80Master, I80Session, SharedI80Bus};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use platform::{NoPin, Words, WordsMut};

use crate::error::Error;
use crate::transfer::{ReadTransfer, RegisterIndex, Selector, Transfer, Width};
use crate::transport::{pulse_reset, BusContext, Transport};
use crate::width::{bus_piece, bus_words_per_element, push_piece};

/// Bus words staged per master call when repacking.
const STAGE_LEN: usize = 64;

/// Window address of a phase.
const fn phase_address(selector: Selector) -> u32 {
    if selector.is_data() {
        1
    } else {
        0
    }
}

/// A register transport over a device window on a shared I80 bus.
pub struct I80Transport<'b, R: RawMutex, M, RST = NoPin> {
    bus: &'b SharedI80Bus<R, M>,
    device: DeviceId,
    reset: Option<RST>,
    data_width: u8,
    readable: bool,
}

impl<'b, R: RawMutex, M: I80Master, RST: OutputPin> I80Transport<'b, R, M, RST> {
    /// Bind registered device `device`.
    ///
    /// The master must be writable.
    pub fn new(
        bus: &'b SharedI80Bus<R, M>,
        device: DeviceId,
        reset: Option<RST>,
    ) -> Result<Self, Error> {
        let (registered, writable, readable, data_width) = bus.lock(|bus| {
            let master = bus.master();
            (
                bus.device(device).is_some(),
                master.writable(),
                master.readable(),
                master.data_width(),
            )
        });
        if !registered {
            return Err(Error::from(::i80::Error::NoSuchDevice));
        }
        if !writable {
            return Err(Error::InvalidArgument("i80 bus not writable"));
        }
        if data_width == 0 || data_width > 32 {
            return Err(Error::InvalidArgument("i80 data width out of range"));
        }
        tracing::debug!(data_width, readable, "lcdreg: I80 transport ready");
        Ok(Self {
            bus,
            device,
            reset,
            data_width,
            readable,
        })
    }

    /// Claim `size` addresses at `address` on `bus` and bind them.
    pub fn attach(
        bus: &'b SharedI80Bus<R, M>,
        address: u32,
        size: u32,
        reset: Option<RST>,
    ) -> Result<Self, Error> {
        let device = bus.register(address, size)?;
        Self::new(bus, device, reset).map_err(|err| {
            if let Err(release) = bus.lock(|bus| bus.unregister(device)) {
                tracing::warn!(%release, "lcdreg: failed to release i80 window");
            }
            err
        })
    }

    /// The device window this transport talks to.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Data lines on the master.
    pub fn data_width(&self) -> u8 {
        self.data_width
    }
}

/// Fixed-size buffer of bus words in the master's element type.
enum Stage {
    U8([u8; STAGE_LEN]),
    U16([u16; STAGE_LEN]),
    U32([u32; STAGE_LEN]),
}

impl Stage {
    fn for_bus(data_width: u8) -> Self {
        match word_size_for(data_width) {
            1 => Self::U8([0; STAGE_LEN]),
            2 => Self::U16([0; STAGE_LEN]),
            _ => Self::U32([0; STAGE_LEN]),
        }
    }

    #[allow(clippy::cast_possible_truncation)] // value already fits the bus width
    fn set(&mut self, index: usize, value: u32) {
        match self {
            Self::U8(buf) => {
                if let Some(slot) = buf.get_mut(index) {
                    *slot = value as u8;
                }
            }
            Self::U16(buf) => {
                if let Some(slot) = buf.get_mut(index) {
                    *slot = value as u16;
                }
            }
            Self::U32(buf) => {
                if let Some(slot) = buf.get_mut(index) {
                    *slot = value;
                }
            }
        }
    }

    fn get(&self, index: usize) -> u32 {
        match self {
            Self::U8(buf) => buf.get(index).copied().map_or(0, u32::from),
            Self::U16(buf) => buf.get(index).copied().map_or(0, u32::from),
            Self::U32(buf) => buf.get(index).copied().unwrap_or(0),
        }
    }

    fn words(&self, len: usize) -> Words<'_> {
        match self {
            Self::U8(buf) => Words::U8(buf.get(..len).unwrap_or_default()),
            Self::U16(buf) => Words::U16(buf.get(..len).unwrap_or_default()),
            Self::U32(buf) => Words::U32(buf.get(..len).unwrap_or_default()),
        }
    }

    fn words_mut(&mut self, len: usize) -> WordsMut<'_> {
        match self {
            Self::U8(buf) => WordsMut::U8(buf.get_mut(..len).unwrap_or_default()),
            Self::U16(buf) => WordsMut::U16(buf.get_mut(..len).unwrap_or_default()),
            Self::U32(buf) => WordsMut::U32(buf.get_mut(..len).unwrap_or_default()),
        }
    }
}

/// Whether `words` at `width` can go to the master unchanged.
fn is_native(words_element_size: usize, width: Width, data_width: u8) -> bool {
    width.bits() <= data_width && words_element_size == word_size_for(data_width)
}

fn write_phase<M: I80Master>(
    session: &mut I80Session<'_, M>,
    address: u32,
    words: Words<'_>,
    width: Width,
) -> Result<(), Error> {
    let data_width = session.data_width();
    if is_native(words.element_size(), width, data_width) {
        return Ok(session.write(address, words)?);
    }
    let bus_bits = usize::from(data_width);
    let pieces = bus_words_per_element(width, bus_bits)?;
    let mut stage = Stage::for_bus(data_width);
    let mut staged = 0;
    for value in words.iter() {
        for piece in (0..pieces).rev() {
            if staged == STAGE_LEN {
                session.write(address, stage.words(staged))?;
                staged = 0;
            }
            stage.set(staged, bus_piece(value, piece, bus_bits));
            staged = staged.saturating_add(1);
        }
    }
    if staged > 0 {
        session.write(address, stage.words(staged))?;
    }
    Ok(())
}

fn read_phase<M: I80Master>(
    session: &mut I80Session<'_, M>,
    address: u32,
    words: &mut WordsMut<'_>,
    width: Width,
) -> Result<(), Error> {
    let data_width = session.data_width();
    if is_native(words.element_size(), width, data_width) {
        return Ok(session.read(address, words.reborrow())?);
    }
    let bus_bits = usize::from(data_width);
    let pieces = bus_words_per_element(width, bus_bits)?;
    let per_chunk = STAGE_LEN.checked_div(pieces).unwrap_or(1).max(1);
    let mut stage = Stage::for_bus(data_width);
    let mut index = 0;
    while index < words.len() {
        let count = per_chunk.min(words.len().saturating_sub(index));
        session.read(address, stage.words_mut(count.saturating_mul(pieces)))?;
        for element in 0..count {
            let first = element.saturating_mul(pieces);
            let value = (first..first.saturating_add(pieces))
                .fold(0, |acc, i| push_piece(acc, stage.get(i), bus_bits));
            words.set(index.saturating_add(element), value);
        }
        index = index.saturating_add(count);
    }
    Ok(())
}

impl<R: RawMutex, M: I80Master, RST: OutputPin> Transport for I80Transport<'_, R, M, RST> {
    fn write(
        &mut self,
        ctx: &BusContext,
        regnr: u32,
        transfer: Option<&Transfer<'_>>,
    ) -> Result<(), Error> {
        let index = RegisterIndex::new(regnr, ctx.default_width);
        let data = transfer.filter(|t| !t.words.is_empty());
        self.bus.with_session(self.device, |session| -> Result<(), Error> {
            write_phase(session, phase_address(Selector::Command), index.words(), ctx.default_width)?;
            match data {
                Some(t) => write_phase(
                    session,
                    phase_address(t.selector),
                    t.words,
                    t.width_or(ctx.default_width),
                ),
                None => Ok(()),
            }
        })
    }

    fn read(
        &mut self,
        ctx: &BusContext,
        regnr: u32,
        transfer: &mut ReadTransfer<'_>,
    ) -> Result<(), Error> {
        if !self.readable {
            return Err(Error::NotReadable);
        }
        let index = RegisterIndex::new(regnr, ctx.default_width);
        let width = transfer.width_or(ctx.default_width);
        let address = phase_address(transfer.selector);
        self.bus.with_session(self.device, |session| -> Result<(), Error> {
            write_phase(session, phase_address(Selector::Command), index.words(), ctx.default_width)?;
            read_phase(session, address, &mut transfer.words, width)
        })
    }

    fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        pulse_reset(self.reset.as_mut(), delay)
    }

    fn readable(&self) -> bool {
        self.readable
    }
}

#[cfg(test)]
mod tests {
    use ::i80::mock::{BusOp, MockI80Master};
    use ::i80::I80Bus;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    use super::*;
    use crate::config::Quirks;
    use crate::error::TransportFault;

    fn ctx(width: Width) -> BusContext {
        BusContext {
            default_width: width,
            quirks: Quirks::empty(),
        }
    }

    fn shared(master: &MockI80Master) -> SharedI80Bus<NoopRawMutex, MockI80Master> {
        SharedI80Bus::new(I80Bus::new(master.clone()))
    }

    #[test]
    fn register_and_data_in_one_session() {
        let master = MockI80Master::new(4, 8);
        let bus = shared(&master);
        let mut transport = I80Transport::<_, _, NoPin>::attach(&bus, 0x4, 2, None).unwrap();
        let data = [0x11u8, 0x22];
        transport
            .write(&ctx(Width::Bits8), 0x2C, Some(&Transfer::data(&data[..])))
            .unwrap();
        assert_eq!(
            master.ops(),
            [
                BusOp::SetAddress(0x4),
                BusOp::Write(vec![0x2C]),
                BusOp::SetAddress(0x5),
                BusOp::Write(vec![0x11, 0x22]),
                BusOp::SetAddress(0),
            ]
        );
    }

    #[test]
    fn wide_register_is_split_big_endian() {
        let master = MockI80Master::new(4, 8);
        let bus = shared(&master);
        let mut transport = I80Transport::<_, _, NoPin>::attach(&bus, 0, 2, None).unwrap();
        transport.write(&ctx(Width::Bits16), 0x0202, None).unwrap();
        assert_eq!(master.ops()[1], BusOp::Write(vec![0x02, 0x02]));

        let data = [0x00AB_CDEFu32];
        let transfer = Transfer::data(&data[..]).with_width(Width::Bits24);
        transport.write(&ctx(Width::Bits8), 0x2C, Some(&transfer)).unwrap();
        assert!(master.ops().contains(&BusOp::Write(vec![0xAB, 0xCD, 0xEF])));
    }

    #[test]
    fn narrow_elements_are_widened() {
        let master = MockI80Master::new(4, 16);
        let bus = shared(&master);
        let mut transport = I80Transport::<_, _, NoPin>::attach(&bus, 0, 2, None).unwrap();
        transport.write(&ctx(Width::Bits8), 0x36, None).unwrap();
        assert_eq!(master.ops()[1], BusOp::Write(vec![0x36]));
    }

    #[test]
    fn long_payload_is_staged_in_chunks() {
        let master = MockI80Master::new(4, 8);
        let bus = shared(&master);
        let mut transport = I80Transport::<_, _, NoPin>::attach(&bus, 0, 2, None).unwrap();
        let data = [0x1234u16; 40];
        transport
            .write(&ctx(Width::Bits16), 0x2C, Some(&Transfer::data(&data[..])))
            .unwrap();
        let writes: Vec<usize> = master
            .ops()
            .iter()
            .filter_map(|op| match op {
                BusOp::Write(w) => Some(w.len()),
                _ => None,
            })
            .collect();
        assert_eq!(writes, [2, 64, 16]);
    }

    #[test]
    fn read_combines_bus_words() {
        let master = MockI80Master::new(4, 8);
        master.queue_rx(&[0x93, 0x25]);
        let bus = shared(&master);
        let mut transport = I80Transport::<_, _, NoPin>::attach(&bus, 0, 2, None).unwrap();
        let mut buf = [0u16; 1];
        transport
            .read(&ctx(Width::Bits16), 0x00, &mut ReadTransfer::data(&mut buf[..]))
            .unwrap();
        assert_eq!(buf, [0x9325]);
        assert!(master.ops().contains(&BusOp::Read(2)));
    }

    #[test]
    fn write_only_master_is_not_readable() {
        let master = MockI80Master::new(4, 8).write_only();
        let bus = shared(&master);
        let mut transport = I80Transport::<_, _, NoPin>::attach(&bus, 0, 2, None).unwrap();
        assert!(!transport.readable());
        let mut buf = [0u8; 1];
        assert_eq!(
            transport.read(&ctx(Width::Bits8), 0, &mut ReadTransfer::data(&mut buf[..])),
            Err(Error::NotReadable)
        );
        assert!(master.ops().is_empty());
    }

    #[test]
    fn read_only_master_is_refused() {
        let master = MockI80Master::new(4, 8).read_only();
        let bus = shared(&master);
        assert!(I80Transport::<_, _, NoPin>::attach(&bus, 0, 2, None).is_err());
    }

    #[test]
    fn latch_failure_is_an_address_fault() {
        let master = MockI80Master::new(4, 8).fail_address(1);
        let bus = shared(&master);
        let mut transport = I80Transport::<_, _, NoPin>::attach(&bus, 0, 2, None).unwrap();
        let data = [0x55u8];
        let result = transport.write(&ctx(Width::Bits8), 0x3A, Some(&Transfer::data(&data[..])));
        assert_eq!(result, Err(Error::Transport(TransportFault::Address)));
    }

    #[test]
    fn failed_attach_releases_window() {
        let master = MockI80Master::new(4, 8).read_only();
        let bus = shared(&master);
        assert!(I80Transport::<_, _, NoPin>::attach(&bus, 0, 2, None).is_err());
        assert!(bus.register(0, 2).is_ok());
    }

    #[test]
    fn overlapping_attach_conflicts() {
        let master = MockI80Master::new(4, 8);
        let bus = shared(&master);
        let _first = I80Transport::<_, _, NoPin>::attach(&bus, 0, 4, None).unwrap();
        assert!(matches!(
            I80Transport::<_, _, NoPin>::attach(&bus, 2, 2, None),
            Err(Error::AddressConflict)
        ));
    }
}
