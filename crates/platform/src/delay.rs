//! Busy-wait delay
//!
//! The configuration protocols need short, hard settle times between clock
//! edges (bitline settle, capture/update pulse width). These are spin waits:
//! a session never yields between the two halves of a pulse.

use embedded_hal::delay::DelayNs;

/// Spin-loop delay calibrated from the core clock.
///
/// Overshoot is acceptable; undershoot is not. The cycle count per
/// nanosecond is rounded up and every wait spins at least once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpinDelay {
    core_hz: u32,
}

impl SpinDelay {
    /// Delay for a core running at `core_hz`.
    #[must_use]
    pub const fn new(core_hz: u32) -> Self {
        Self { core_hz }
    }

    /// Core clock this delay was calibrated for.
    pub const fn core_hz(&self) -> u32 {
        self.core_hz
    }

    /// Spin iterations covering `ns` nanoseconds (at least one).
    pub fn cycles_for(&self, ns: u32) -> u64 {
        let cycles = u64::from(ns)
            .saturating_mul(u64::from(self.core_hz))
            .div_ceil(1_000_000_000);
        cycles.max(1)
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        for _ in 0..self.cycles_for(ns) {
            core::hint::spin_loop();
        }
    }
}
