//! ICB (interconnect configuration block) register map
//!
//! Source: Rigel ICB programming guide, register summary.
//!
//! ```text
//! CFG_CTL  [6]        [5]     [4]      [3]       [2]           [1]           [0]
//!          CHKSUM_EN  UPDATE  CAPTURE  CMD_DATA  SOFT_RESET_N  CFG_KICKOFF   CFG_DONE
//!
//! CFG_CMD  [9]         [8]        [7:0]
//!          BYTE_TWIST  BIT_TWIST  CMD
//! ```
//!
//! CFG_KICKOFF self-clears once the shift engine has consumed the chain;
//! CFG_DONE is raised by hardware at the same time.

use platform::{Access, Field, RegisterSpec};

// ---------------------------------------------------------------------------
// Register offsets
// ---------------------------------------------------------------------------

/// Configuration control
pub const REG_CFG_CTL: usize = 0x00;

/// Configuration command and data-path twists
pub const REG_CFG_CMD: usize = 0x04;

/// Expected chain checksum
pub const REG_CHKSUM_WORD: usize = 0x08;

/// Scan chain length in bits
pub const REG_CHAIN_LENGTH: usize = 0x0C;

/// Status (checksum result)
pub const REG_STATUS: usize = 0x10;

/// Shift engine state (read-only)
pub const REG_SHIFT_STATUS: usize = 0x14;

/// Chain transmit FIFO
pub const REG_TX: usize = 0x18;

/// Chain receive FIFO
pub const REG_RX: usize = 0x1C;

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// CFG_CTL: configuration done
pub const CFG_DONE: Field = Field::bit(0);

/// CFG_CTL: start the shift engine (self-clearing)
pub const CFG_KICKOFF: Field = Field::bit(1);

/// CFG_CTL: soft reset, active low
pub const SOFT_RESET_N: Field = Field::bit(2);

/// CFG_CTL: payload carries command data rather than chain data
pub const CMD_DATA: Field = Field::bit(3);

/// CFG_CTL: capture control
pub const CAPTURE: Field = Field::bit(4);

/// CFG_CTL: update control
pub const UPDATE: Field = Field::bit(5);

/// CFG_CTL: compare the chain against `REG_CHKSUM_WORD`
pub const CHKSUM_EN: Field = Field::bit(6);

/// CFG_CMD: configuration command
pub const CMD: Field = Field::new(0, 8);

/// CFG_CMD: reverse bit order within each byte
pub const BIT_TWIST: Field = Field::bit(8);

/// CFG_CMD: reverse byte order within each word
pub const BYTE_TWIST: Field = Field::bit(9);

/// STATUS: checksum matched
pub const CHKSUM_OK: Field = Field::bit(0);

/// SHIFT_STATUS: shift engine busy
pub const FSM_BUSY: Field = Field::bit(0);

// ---------------------------------------------------------------------------
// Configuration commands (CFG_CMD[7:0])
// ---------------------------------------------------------------------------

/// Values of the `cfg_cmd` header field.
pub mod cmd {
    /// Write the chain
    pub const WRITE: u8 = 0;
    /// Write the chain and compare its checksum
    pub const WRITE_CHECKSUM: u8 = 1;
    /// Read the chain back after a checksummed write
    ///
    /// Also the threshold: commands from here up move data out of the
    /// fabric through `REG_RX`.
    pub const READ_POSTCHKSUM: u8 = 2;
    /// Read the chain
    pub const READ: u8 = 3;

    /// `true` for commands that read the chain out of the fabric.
    pub const fn is_read(cfg_cmd: u8) -> bool {
        cfg_cmd >= READ_POSTCHKSUM
    }
}

// ---------------------------------------------------------------------------
// Register map
// ---------------------------------------------------------------------------

/// ICB register map, for diagnostics and the simulator.
pub const REGISTER_MAP: &[RegisterSpec] = &[
    RegisterSpec::new(REG_CFG_CTL, "CFG_CTL", Access::ReadWrite),
    RegisterSpec::new(REG_CFG_CMD, "CFG_CMD", Access::ReadWrite),
    RegisterSpec::new(REG_CHKSUM_WORD, "CHKSUM_WORD", Access::ReadWrite),
    RegisterSpec::new(REG_CHAIN_LENGTH, "CHAIN_LENGTH", Access::ReadWrite),
    RegisterSpec::new(REG_STATUS, "STATUS", Access::ReadWrite),
    RegisterSpec::new(REG_SHIFT_STATUS, "SHIFT_STATUS", Access::ReadOnly),
    RegisterSpec::new(REG_TX, "TX", Access::Fifo { bit_counter: None }),
    RegisterSpec::new(REG_RX, "RX", Access::Fifo { bit_counter: None }),
];

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use platform::register::{block_len, register_name};

    #[test]
    fn test_read_threshold() {
        assert!(!cmd::is_read(cmd::WRITE));
        assert!(!cmd::is_read(cmd::WRITE_CHECKSUM));
        assert!(cmd::is_read(cmd::READ_POSTCHKSUM));
        assert!(cmd::is_read(cmd::READ));
    }

    #[test]
    fn test_map_names() {
        assert_eq!(register_name(REGISTER_MAP, REG_SHIFT_STATUS), "SHIFT_STATUS");
        assert_eq!(block_len(REGISTER_MAP), REG_RX + 4);
    }
}
