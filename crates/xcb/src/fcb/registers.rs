//! FCB (fabric configuration block) register map
//!
//! Source: Rigel FCB programming guide, register summary.
//!
//! # Wordline mode latch
//!
//! The wordline clocks, the walking "bottom" bit and the two bitline strobes
//! live in one internal latch. Software never writes the latch directly:
//! it writes ones to `REG_WL_MODE_SET` or `REG_WL_MODE_CLR`, and reads the
//! result back through the read-only mirror `REG_OP`. Every sequencing step
//! is verified against that mirror.
//!
//! ```text
//! REG_OP  [4]      [3]      [2]     [1]   [0]
//!         OSTROBE  ESTROBE  BOTTOM  SCLK  MCLK
//! ```
//!
//! # Bitline counter
//!
//! `REG_BL_WR_CNT` counts bits shifted through `REG_BL_TX` (32 per word).
//! Any write to `REG_BL_CLR` zeroes it.

use platform::{Access, Field, RegisterSpec};

// ---------------------------------------------------------------------------
// Register offsets
// ---------------------------------------------------------------------------

/// Configuration control
pub const REG_CFG_CTL: usize = 0x00;

/// Status (checksum result)
pub const REG_STATUS: usize = 0x04;

/// Wordline mode latch, write-one-to-set port
pub const REG_WL_MODE_SET: usize = 0x08;

/// Wordline mode latch, write-one-to-clear port
pub const REG_WL_MODE_CLR: usize = 0x0C;

/// Read-only mirror of the wordline mode latch
pub const REG_OP: usize = 0x10;

/// Wordline counter
pub const REG_WL_CNT: usize = 0x14;

/// Wordline read counter (readback sessions)
pub const REG_WL_RD_CNT: usize = 0x18;

/// Bits shifted into the bitline register since the last clear (read-only)
pub const REG_BL_WR_CNT: usize = 0x1C;

/// Bitline write-counter clear strobe
pub const REG_BL_CLR: usize = 0x20;

/// Expected bitstream checksum
pub const REG_CHKSUM_WORD: usize = 0x24;

/// Bitline transmit FIFO
pub const REG_BL_TX: usize = 0x28;

/// Bitline receive FIFO
pub const REG_BL_RX: usize = 0x2C;

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// CFG_CTL: configuration done
pub const CFG_DONE: Field = Field::bit(0);

/// CFG_CTL: connect the bitline register to the transfer FIFO
pub const BL_GATING: Field = Field::bit(1);

/// CFG_CTL: check the running checksum against `REG_CHKSUM_WORD`
pub const CHKSUM_PRECHECK_EN: Field = Field::bit(2);

/// STATUS: checksum matched
pub const CHKSUM_OK: Field = Field::bit(0);

/// Whole STATUS register
pub const STATUS_ALL: Field = Field::new(0, 8);

/// WL_CNT / WL_RD_CNT value
pub const WL_COUNT: Field = Field::new(0, 16);

// ---------------------------------------------------------------------------
// Wordline mode latch bits (REG_WL_MODE_SET / _CLR / REG_OP)
// ---------------------------------------------------------------------------

/// Master wordline clock
pub const WL_MCLK: u32 = 1 << 0;

/// Slave wordline clock
pub const WL_SCLK: u32 = 1 << 1;

/// Walking bit: selects the bottom half (MPU1) of the wordline
pub const WL_BOTTOM: u32 = 1 << 2;

/// Even bitline strobe
pub const WL_ESTROBE: u32 = 1 << 3;

/// Odd bitline strobe
pub const WL_OSTROBE: u32 = 1 << 4;

/// Both wordline clocks
pub const WL_CLOCKS: u32 = WL_MCLK | WL_SCLK;

/// Both bitline strobes
pub const WL_STROBES: u32 = WL_ESTROBE | WL_OSTROBE;

/// Every latch bit
pub const WL_ALL: u32 = WL_CLOCKS | WL_BOTTOM | WL_STROBES;

// ---------------------------------------------------------------------------
// Register map
// ---------------------------------------------------------------------------

/// FCB register map, for diagnostics and the simulator.
pub const REGISTER_MAP: &[RegisterSpec] = &[
    RegisterSpec::new(REG_CFG_CTL, "CFG_CTL", Access::ReadWrite),
    RegisterSpec::new(REG_STATUS, "STATUS", Access::ReadWrite),
    RegisterSpec::new(REG_WL_MODE_SET, "WL_MODE_SET", Access::WriteOneToSet { target: REG_OP }),
    RegisterSpec::new(REG_WL_MODE_CLR, "WL_MODE_CLR", Access::WriteOneToClear { target: REG_OP }),
    RegisterSpec::new(REG_OP, "OP_REG", Access::ReadOnly),
    RegisterSpec::new(REG_WL_CNT, "WL_CNT", Access::ReadWrite),
    RegisterSpec::new(REG_WL_RD_CNT, "WL_RD_CNT", Access::ReadWrite),
    RegisterSpec::new(REG_BL_WR_CNT, "BL_WR_CNT", Access::ReadOnly),
    RegisterSpec::new(REG_BL_CLR, "BL_CLR", Access::ClearOnWrite { target: REG_BL_WR_CNT }),
    RegisterSpec::new(REG_CHKSUM_WORD, "CHKSUM_WORD", Access::ReadWrite),
    RegisterSpec::new(REG_BL_TX, "BL_TX", Access::Fifo { bit_counter: Some(REG_BL_WR_CNT) }),
    RegisterSpec::new(REG_BL_RX, "BL_RX", Access::Fifo { bit_counter: None }),
];
