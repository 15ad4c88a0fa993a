//! FCB wordline sequencing primitives
//!
//! Each primitive is a fixed series of ticks on the wordline mode latch.
//! A tick is one write to `WL_MODE_SET` or `WL_MODE_CLR` followed by one
//! read of the `OP_REG` mirror; the series stops at the first tick whose
//! mirror disagrees and reports [`XcbError::InvalidBitValue`]. Nothing is
//! retried.
//!
//! | Primitive      | Ticks                                                    |
//! |----------------|----------------------------------------------------------|
//! | `early(b)`     | set or clear BOTTOM                                      |
//! | `force(b)`     | clear clocks; set clocks(+BOTTOM); clear clocks          |
//! | `advance(b)`   | clear clocks; set MCLK(+BOTTOM); clear MCLK; set/clear SCLK |
//! | `both()`       | set E+O strobes; settle; clear E+O strobes               |
//! | `even()`/`odd()` | one strobe, same shape as `both()`                     |
//!
//! The settle wait inside the strobe pulses is a blocking [`DelayNs`] call
//! and is never skipped, whatever the configured duration.

use embedded_hal::delay::DelayNs;
use platform::RegisterBus;

use super::registers::{
    REG_OP, REG_WL_MODE_CLR, REG_WL_MODE_SET, WL_ALL, WL_BOTTOM, WL_CLOCKS, WL_ESTROBE, WL_MCLK,
    WL_OSTROBE, WL_SCLK, WL_STROBES,
};
use crate::config::FcbConfig;
use crate::error::XcbError;
use crate::verify::{latch_clear, latch_set};

/// Wordline sequencer over an FCB register block.
pub struct FcbSequencer<B, D> {
    bus: B,
    delay: D,
    settle_ns: u32,
}

impl<B: RegisterBus, D: DelayNs> FcbSequencer<B, D> {
    /// Sequencer over `bus` using `delay` for the bitline settle time.
    pub fn new(bus: B, delay: D, config: FcbConfig) -> Self {
        Self {
            bus,
            delay,
            settle_ns: config.settle_ns,
        }
    }

    /// The register block.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Configured settle time.
    pub fn settle_ns(&self) -> u32 {
        self.settle_ns
    }

    /// Release the bus and delay.
    pub fn into_parts(self) -> (B, D) {
        (self.bus, self.delay)
    }

    fn set(&mut self, mask: u32) -> Result<(), XcbError> {
        latch_set(&mut self.bus, REG_WL_MODE_SET, REG_OP, mask)
            .map_err(|e| e.escalate(XcbError::InvalidBitValue))
    }

    fn clear(&mut self, mask: u32) -> Result<(), XcbError> {
        latch_clear(&mut self.bus, REG_WL_MODE_CLR, REG_OP, mask)
            .map_err(|e| e.escalate(XcbError::InvalidBitValue))
    }

    fn pulse(&mut self, strobes: u32) -> Result<(), XcbError> {
        self.set(strobes)?;
        self.delay.delay_ns(self.settle_ns);
        self.clear(strobes)
    }

    /// Move the walking bit to the bottom (`true`) or top half.
    pub fn early(&mut self, bottom: bool) -> Result<(), XcbError> {
        if bottom {
            self.set(WL_BOTTOM)
        } else {
            self.clear(WL_BOTTOM)
        }
    }

    /// Force the walking bit into the wordline with one full clock.
    ///
    /// The final "clocks low" tick runs even when an earlier tick failed;
    /// the first error is the one reported.
    pub fn force(&mut self, bottom: bool) -> Result<(), XcbError> {
        let edges = self.force_edges(bottom);
        let low = self.clear(WL_CLOCKS);
        edges.and(low)
    }

    fn force_edges(&mut self, bottom: bool) -> Result<(), XcbError> {
        self.clear(WL_CLOCKS)?;
        if bottom {
            self.set(WL_CLOCKS | WL_BOTTOM)
        } else {
            self.clear(WL_BOTTOM)?;
            self.set(WL_CLOCKS)
        }
    }

    /// Shift the wordline by one position.
    pub fn advance(&mut self, bottom: bool) -> Result<(), XcbError> {
        self.clear(WL_CLOCKS)?;
        self.set(if bottom { WL_MCLK | WL_BOTTOM } else { WL_MCLK })?;
        self.clear(WL_MCLK)?;
        self.set(WL_SCLK)?;
        self.clear(WL_SCLK)
    }

    /// Strobe both bitline halves.
    pub fn both(&mut self) -> Result<(), XcbError> {
        self.pulse(WL_STROBES)
    }

    /// Strobe the even bitlines only.
    pub fn even(&mut self) -> Result<(), XcbError> {
        self.pulse(WL_ESTROBE)
    }

    /// Strobe the odd bitlines only.
    pub fn odd(&mut self) -> Result<(), XcbError> {
        self.pulse(WL_OSTROBE)
    }

    /// Drop every latch bit (clocks, walking bit, strobes).
    pub fn idle(&mut self) -> Result<(), XcbError> {
        self.clear(WL_ALL)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
