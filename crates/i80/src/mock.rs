//! Recording master for tests.

#![cfg(any(test, feature = "std"))]

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use platform::mocks::MockError;
use platform::{Words, WordsMut};

use crate::master::{word_size_for, I80Master};

/// Operation seen by [`MockI80Master`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    /// Address latched
    SetAddress(u32),
    /// Elements written, widened to `u32`
    Write(Vec<u32>),
    /// Number of elements read
    Read(usize),
}

#[derive(Debug)]
struct State {
    address_width: u8,
    data_width: u8,
    readable: bool,
    writable: bool,
    ops: Vec<BusOp>,
    rx: VecDeque<u32>,
    fail_address: Option<u32>,
}

/// Recording master; clones share state.
#[derive(Debug, Clone)]
pub struct MockI80Master {
    state: Rc<RefCell<State>>,
}

impl MockI80Master {
    /// Readable and writable master.
    pub fn new(address_width: u8, data_width: u8) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                address_width,
                data_width,
                readable: true,
                writable: true,
                ops: Vec::new(),
                rx: VecDeque::new(),
                fail_address: None,
            })),
        }
    }

    /// Drop read capability.
    #[must_use]
    pub fn write_only(self) -> Self {
        self.state.borrow_mut().readable = false;
        self
    }

    /// Drop write capability.
    #[must_use]
    pub fn read_only(self) -> Self {
        self.state.borrow_mut().writable = false;
        self
    }

    /// Make latching `address` fail without being recorded.
    #[must_use]
    pub fn fail_address(self, address: u32) -> Self {
        self.state.borrow_mut().fail_address = Some(address);
        self
    }

    /// Queue elements returned by reads.
    pub fn queue_rx(&self, values: &[u32]) {
        self.state.borrow_mut().rx.extend(values.iter().copied());
    }

    /// Everything recorded so far.
    pub fn ops(&self) -> Vec<BusOp> {
        self.state.borrow().ops.clone()
    }

    /// Forget recorded operations.
    pub fn clear(&self) {
        self.state.borrow_mut().ops.clear();
    }
}

impl I80Master for MockI80Master {
    type Error = MockError;

    fn address_width(&self) -> u8 {
        self.state.borrow().address_width
    }

    fn data_width(&self) -> u8 {
        self.state.borrow().data_width
    }

    fn readable(&self) -> bool {
        self.state.borrow().readable
    }

    fn writable(&self) -> bool {
        self.state.borrow().writable
    }

    fn set_address(&mut self, address: u32) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_address == Some(address) {
            return Err(MockError);
        }
        state.ops.push(BusOp::SetAddress(address));
        Ok(())
    }

    fn write(&mut self, words: Words<'_>) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if words.element_size() != word_size_for(state.data_width) {
            return Err(MockError);
        }
        state.ops.push(BusOp::Write(words.iter().collect()));
        Ok(())
    }

    fn read(&mut self, mut words: WordsMut<'_>) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if words.element_size() != word_size_for(state.data_width) {
            return Err(MockError);
        }
        for index in 0..words.len() {
            let value = state.rx.pop_front().unwrap_or(0);
            words.set(index, value);
        }
        state.ops.push(BusOp::Read(words.len()));
        Ok(())
    }
}
