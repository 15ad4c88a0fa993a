//! Controller configuration for the Rigel fabric
//!
//! Base addresses of the three configuration blocks and the two timing
//! parameters the protocols need. Defaults match the Rigel SoC memory map.
//!
//! # Memory map
//!
//! ```text
//! Base         Size   Block
//! 0x4001_4000  4 KB   FCB  fabric configuration block
//! 0x4001_5000  4 KB   ICB  interconnect configuration block
//! 0x4001_6000  4 KB   PCB  peripheral configuration block
//! ```

use platform::MmioRegisters;

/// FCB register block base address.
pub const FCB_BASE_ADDR: usize = 0x4001_4000;

/// ICB register block base address.
pub const ICB_BASE_ADDR: usize = 0x4001_5000;

/// PCB register block base address.
pub const PCB_BASE_ADDR: usize = 0x4001_6000;

/// Address window reserved for each block.
pub const BLOCK_WINDOW: usize = 0x1000;

/// Bitline settle time between raising and dropping the E/O strobes (ns).
///
/// The bitline drivers need 20 configuration-clock cycles to settle after
/// the strobes rise. At the slowest supported configuration clock
/// (80 MHz, 12.5 ns period) that is 250 ns.
pub const DEFAULT_BITLINE_SETTLE_NS: u32 = 250;

/// Width of the ICB capture and update pulses (µs).
pub const ICB_CAP_UPD_PULSE_DELAY_US: u32 = 10;

/// FCB timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FcbConfig {
    /// Delay between the strobe-high and strobe-low writes of `both()`,
    /// `even()` and `odd()`. Must be non-zero.
    pub settle_ns: u32,
}

impl Default for FcbConfig {
    fn default() -> Self {
        Self {
            settle_ns: DEFAULT_BITLINE_SETTLE_NS,
        }
    }
}

/// ICB timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IcbConfig {
    /// Capture/update pulse width. Must be non-zero.
    pub pulse_delay_us: u32,
}

impl Default for IcbConfig {
    fn default() -> Self {
        Self {
            pulse_delay_us: ICB_CAP_UPD_PULSE_DELAY_US,
        }
    }
}

/// Configuration rejected by [`XcbConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `settle_ns` or `pulse_delay_us` is zero
    ZeroDelay,
    /// A base address is not word aligned
    MisalignedBase(usize),
    /// Two block windows overlap
    OverlappingBlocks,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroDelay => f.write_str("settle and pulse delays must be non-zero"),
            Self::MisalignedBase(base) => write!(f, "base address {base:#x} is not word aligned"),
            Self::OverlappingBlocks => f.write_str("configuration blocks overlap"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Board-level configuration of all three controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct XcbConfig {
    /// FCB register block base
    pub fcb_base: usize,
    /// ICB register block base
    pub icb_base: usize,
    /// PCB register block base
    pub pcb_base: usize,
    /// FCB timing
    pub fcb: FcbConfig,
    /// ICB timing
    pub icb: IcbConfig,
}

impl Default for XcbConfig {
    fn default() -> Self {
        Self {
            fcb_base: FCB_BASE_ADDR,
            icb_base: ICB_BASE_ADDR,
            pcb_base: PCB_BASE_ADDR,
            fcb: FcbConfig::default(),
            icb: IcbConfig::default(),
        }
    }
}

impl XcbConfig {
    /// Check delays and the address map.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fcb.settle_ns == 0 || self.icb.pulse_delay_us == 0 {
            return Err(ConfigError::ZeroDelay);
        }
        let bases = [self.fcb_base, self.icb_base, self.pcb_base];
        if let Some(&base) = bases.iter().find(|b| **b % 4 != 0) {
            return Err(ConfigError::MisalignedBase(base));
        }
        for (i, a) in bases.iter().enumerate() {
            for b in bases.iter().skip(i.saturating_add(1)) {
                if a.abs_diff(*b) < BLOCK_WINDOW {
                    return Err(ConfigError::OverlappingBlocks);
                }
            }
        }
        Ok(())
    }

    /// FCB register block.
    ///
    /// # Safety
    ///
    /// `fcb_base` must be the FCB block of this SoC and no other handle to it
    /// may exist.
    pub unsafe fn fcb_registers(&self) -> MmioRegisters {
        // SAFETY: forwarded to the caller.
        unsafe { MmioRegisters::new(self.fcb_base, BLOCK_WINDOW) }
    }

    /// ICB register block.
    ///
    /// # Safety
    ///
    /// `icb_base` must be the ICB block of this SoC and no other handle to it
    /// may exist.
    pub unsafe fn icb_registers(&self) -> MmioRegisters {
        // SAFETY: forwarded to the caller.
        unsafe { MmioRegisters::new(self.icb_base, BLOCK_WINDOW) }
    }

    /// PCB register block.
    ///
    /// # Safety
    ///
    /// `pcb_base` must be the PCB block of this SoC and no other handle to it
    /// may exist.
    pub unsafe fn pcb_registers(&self) -> MmioRegisters {
        // SAFETY: forwarded to the caller.
        unsafe { MmioRegisters::new(self.pcb_base, BLOCK_WINDOW) }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
