//! Register-file simulator for host tests
//!
//! [`SimBus`] plays the part of a configuration controller's register block.
//! It is driven by the same [`RegisterSpec`] map the driver publishes, so
//! write-one-to-set latches, read-only mirrors, FIFO bit counters and
//! clear-on-write strobes behave the way the hardware does.
//!
//! # Fault injection
//!
//! - [`SimBus::freeze`]: the register never changes again (the latch is
//!   "disconnected" from its mirror).
//! - [`SimBus::stick`]: reads always return a fixed value.
//! - [`SimBus::script_reads`]: queue values returned by the next reads of a
//!   register (FIFO receive data, busy-flag sequences).
//! - [`SimBus::on_transfer`]: bits the hardware sets or clears by itself
//!   once payload moves through a FIFO (kickoff self-clear, done flags).
//!
//! Every access and every [`SimDelay`] wait lands in a bounded operation
//! log, stamped against a simulated nanosecond clock.

#![cfg(any(test, feature = "std"))]

use core::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::register::{Access, RegisterBus, RegisterSpec};
use crate::transfer::{TransferHandler, TransferRequest};

/// Registers backed by the simulator (offsets `0x00..0x100`).
pub const SIM_REGISTERS: usize = 64;

/// Operation log capacity. Later operations are counted but not kept.
pub const SIM_LOG_CAPACITY: usize = 2048;

const MAX_FAULTS: usize = 16;
const MAX_SCRIPTED: usize = 256;

/// One logged bus operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    /// Register read and the value returned
    Read {
        /// Byte offset
        offset: usize,
        /// Value returned to the driver
        value: u32,
    },
    /// Register write as issued by the driver
    Write {
        /// Byte offset
        offset: usize,
        /// Value written
        value: u32,
    },
    /// Blocking delay
    Delay {
        /// Requested duration
        ns: u32,
    },
}

/// Self-driven hardware reaction to FIFO traffic.
#[derive(Debug, Clone, Copy)]
struct Completion {
    trigger: usize,
    reg: usize,
    set: u32,
    clear: u32,
}

#[derive(Debug)]
struct SimState {
    map: &'static [RegisterSpec],
    regs: [u32; SIM_REGISTERS],
    frozen: heapless::Vec<usize, MAX_FAULTS>,
    stuck: heapless::Vec<(usize, u32), MAX_FAULTS>,
    scripted: heapless::Vec<(usize, u32), MAX_SCRIPTED>,
    completions: heapless::Vec<Completion, MAX_FAULTS>,
    log: heapless::Vec<BusOp, SIM_LOG_CAPACITY>,
    dropped: usize,
    clock_ns: u64,
}

impl SimState {
    fn access(&self, offset: usize) -> Access {
        self.map
            .iter()
            .find(|spec| spec.offset == offset)
            .map_or(Access::ReadWrite, |spec| spec.access)
    }

    fn record(&mut self, op: BusOp) {
        if self.log.push(op).is_err() {
            self.dropped = self.dropped.saturating_add(1);
        }
    }

    fn stored(&self, offset: usize) -> u32 {
        self.regs.get(offset / 4).copied().unwrap_or(0)
    }

    /// Update storage unless the register is frozen.
    fn store(&mut self, offset: usize, value: u32) {
        if self.frozen.contains(&offset) {
            return;
        }
        if let Some(slot) = self.regs.get_mut(offset / 4) {
            *slot = value;
        }
    }

    fn complete(&mut self, fifo: usize) {
        let hits: heapless::Vec<Completion, MAX_FAULTS> = self
            .completions
            .iter()
            .filter(|c| c.trigger == fifo)
            .copied()
            .collect();
        for c in hits {
            let value = (self.stored(c.reg) & !c.clear) | c.set;
            self.store(c.reg, value);
        }
    }

    fn read(&mut self, offset: usize) -> u32 {
        let value = if let Some(&(_, v)) = self.stuck.iter().find(|(o, _)| *o == offset) {
            v
        } else if let Some(pos) = self.scripted.iter().position(|(o, _)| *o == offset) {
            self.scripted.remove(pos).1
        } else {
            self.stored(offset)
        };
        if matches!(self.access(offset), Access::Fifo { .. }) {
            self.complete(offset);
        }
        self.record(BusOp::Read { offset, value });
        value
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.record(BusOp::Write { offset, value });
        match self.access(offset) {
            Access::ReadWrite => self.store(offset, value),
            Access::ReadOnly => {}
            Access::WriteOneToSet { target } => {
                let latched = self.stored(target) | value;
                self.store(target, latched);
            }
            Access::WriteOneToClear { target } => {
                let latched = self.stored(target) & !value;
                self.store(target, latched);
            }
            Access::ClearOnWrite { target } => self.store(target, 0),
            Access::Fifo { bit_counter } => {
                self.store(offset, value);
                if let Some(counter) = bit_counter {
                    let bits = self.stored(counter).wrapping_add(32);
                    self.store(counter, bits);
                }
                self.complete(offset);
            }
        }
    }
}

/// Simulated controller register block.
///
/// Cloning shares the same register file, so a test can keep a handle for
/// inspection after moving the bus into a driver.
#[derive(Debug, Clone)]
pub struct SimBus {
    state: Rc<RefCell<SimState>>,
}

impl SimBus {
    /// All-zero register block described by `map`.
    pub fn new(map: &'static [RegisterSpec]) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState {
                map,
                regs: [0; SIM_REGISTERS],
                frozen: heapless::Vec::new(),
                stuck: heapless::Vec::new(),
                scripted: heapless::Vec::new(),
                completions: heapless::Vec::new(),
                log: heapless::Vec::new(),
                dropped: 0,
                clock_ns: 0,
            })),
        }
    }

    /// Delay source sharing this bus's clock and log.
    pub fn delay(&self) -> SimDelay {
        SimDelay {
            state: Rc::clone(&self.state),
        }
    }

    /// Set a register's stored value without logging (test setup).
    pub fn poke(&self, offset: usize, value: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(slot) = state.regs.get_mut(offset / 4) {
            *slot = value;
        }
    }

    /// Stored value of a register, bypassing faults and the log.
    pub fn peek(&self, offset: usize) -> u32 {
        self.state.borrow().stored(offset)
    }

    /// Ignore every future update of `offset`.
    ///
    /// # Panics
    ///
    /// If more than 16 registers are frozen.
    pub fn freeze(&self, offset: usize) {
        let pushed = self.state.borrow_mut().frozen.push(offset);
        assert!(pushed.is_ok(), "SimBus: more than {MAX_FAULTS} frozen registers");
    }

    /// Make every read of `offset` return `value`.
    ///
    /// # Panics
    ///
    /// If more than 16 registers are stuck.
    pub fn stick(&self, offset: usize, value: u32) {
        let pushed = self.state.borrow_mut().stuck.push((offset, value));
        assert!(pushed.is_ok(), "SimBus: more than {MAX_FAULTS} stuck registers");
    }

    /// Remove all `stick` and `freeze` faults.
    pub fn heal(&self) {
        let mut state = self.state.borrow_mut();
        state.stuck.clear();
        state.frozen.clear();
    }

    /// Queue `values` for the next reads of `offset`.
    ///
    /// # Panics
    ///
    /// If more than 256 reads are pending at once.
    pub fn script_reads(&self, offset: usize, values: &[u32]) {
        let mut state = self.state.borrow_mut();
        for &value in values {
            let pushed = state.scripted.push((offset, value));
            assert!(pushed.is_ok(), "SimBus: more than {MAX_SCRIPTED} scripted reads");
        }
    }

    /// After each FIFO access at `trigger`, set `set` and clear `clear` in
    /// register `reg`.
    ///
    /// # Panics
    ///
    /// If more than 16 completions are registered.
    pub fn on_transfer(&self, trigger: usize, reg: usize, set: u32, clear: u32) {
        let pushed = self.state.borrow_mut().completions.push(Completion {
            trigger,
            reg,
            set,
            clear,
        });
        assert!(pushed.is_ok(), "SimBus: more than {MAX_FAULTS} completions");
    }

    /// Logged operations, oldest first.
    pub fn ops(&self) -> Vec<BusOp> {
        self.state.borrow().log.iter().copied().collect()
    }

    /// Values written to `offset`, in order.
    pub fn writes_to(&self, offset: usize) -> Vec<u32> {
        self.state
            .borrow()
            .log
            .iter()
            .filter_map(|op| match op {
                BusOp::Write { offset: o, value } if *o == offset => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Number of reads of `offset`.
    pub fn reads_of(&self, offset: usize) -> usize {
        self.state
            .borrow()
            .log
            .iter()
            .filter(|op| matches!(op, BusOp::Read { offset: o, .. } if *o == offset))
            .count()
    }

    /// Operations that did not fit the log.
    pub fn dropped(&self) -> usize {
        self.state.borrow().dropped
    }

    /// Forget logged operations (faults and storage are kept).
    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.log.clear();
        state.dropped = 0;
    }

    /// Simulated time elapsed in [`SimDelay`] waits.
    pub fn clock_ns(&self) -> u64 {
        self.state.borrow().clock_ns
    }

    /// Datasheet name of `offset` in this block's map.
    pub fn name_of(&self, offset: usize) -> &'static str {
        crate::register::register_name(self.state.borrow().map, offset)
    }
}

impl RegisterBus for SimBus {
    fn read(&mut self, offset: usize) -> u32 {
        self.state.borrow_mut().read(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.state.borrow_mut().write(offset, value);
    }
}

/// Delay that advances the simulated clock instead of waiting.
#[derive(Debug, Clone)]
pub struct SimDelay {
    state: Rc<RefCell<SimState>>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        let mut state = self.state.borrow_mut();
        state.clock_ns = state.clock_ns.saturating_add(u64::from(ns));
        state.record(BusOp::Delay { ns });
    }
}

/// Error returned by [`FailingTransfer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimTransferError;

/// Transfer handler that always fails without touching the bus.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingTransfer;

impl<B: RegisterBus> TransferHandler<B> for FailingTransfer {
    type Error = SimTransferError;

    fn transfer(&mut self, _bus: &mut B, _request: TransferRequest<'_>) -> Result<(), Self::Error> {
        Err(SimTransferError)
    }
}
