//! Bitstream header parser
//!
//! Every configuration session starts from a metadata blob: a generic
//! action header, an optional checksum and a controller-specific trailer.
//! All multi-byte integers are little-endian.
//!
//! Layout:
//! ```text
//! [0..2]    action_enum    u16 le   bit 12 = checksum present
//! [2..4]    action_size    u16 le
//! [4..8]    payload_size   u32 le
//! [8..12]   checksum       u32 le   only when bit 12 is set
//! [8|12..]  trailer        controller specific, see FcbControl/IcbControl/PcbControl
//! ```
//!
//! Decoding is field by field from a byte slice. A blob shorter than the
//! header it announces is rejected with [`XcbError::InvalidDataLength`]; an
//! empty blob counts as a missing one ([`XcbError::NullPointer`]).

use platform::{ControllerKind, TransferDirection};

use crate::error::XcbError;

/// Longest possible header: generic + checksum + PCB trailer.
pub const MAX_HEADER_LEN: usize = ActionHeader::SIZE + CHECKSUM_LEN + 8;

const CHECKSUM_LEN: usize = 4;

/// Encoded header bytes.
pub type HeaderBytes = heapless::Vec<u8, MAX_HEADER_LEN>;

fn le_u16(raw: &[u8], at: usize) -> Result<u16, XcbError> {
    let end = at.checked_add(2).ok_or(XcbError::InvalidDataLength)?;
    let bytes = raw.get(at..end).ok_or(XcbError::InvalidDataLength)?;
    Ok(u16::from_le_bytes(
        bytes.try_into().map_err(|_| XcbError::InvalidDataLength)?,
    ))
}

fn le_u32(raw: &[u8], at: usize) -> Result<u32, XcbError> {
    let end = at.checked_add(4).ok_or(XcbError::InvalidDataLength)?;
    let bytes = raw.get(at..end).ok_or(XcbError::InvalidDataLength)?;
    Ok(u32::from_le_bytes(
        bytes.try_into().map_err(|_| XcbError::InvalidDataLength)?,
    ))
}

fn push(out: &mut HeaderBytes, bytes: &[u8]) -> Result<(), XcbError> {
    out.extend_from_slice(bytes)
        .map_err(|_| XcbError::OutOfLimit)
}

// ---------------------------------------------------------------------------
// Generic action header
// ---------------------------------------------------------------------------

/// Generic prefix shared by every controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActionHeader {
    /// Action code; bit 12 flags a checksum word
    pub action_enum: u16,
    /// Size of the action record
    pub action_size: u16,
    /// Payload bytes following the header
    pub payload_size: u32,
}

impl ActionHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = 8;

    /// `action_enum` flag: a 32-bit checksum follows the generic header.
    pub const CHECKSUM_PRESENT: u16 = 1 << 12;

    /// `true` when a checksum word follows.
    pub const fn has_checksum(&self) -> bool {
        self.action_enum & Self::CHECKSUM_PRESENT != 0
    }

    fn decode(raw: &[u8]) -> Result<Self, XcbError> {
        Ok(Self {
            action_enum: le_u16(raw, 0)?,
            action_size: le_u16(raw, 2)?,
            payload_size: le_u32(raw, 4)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Controller trailers
// ---------------------------------------------------------------------------

/// Controller-specific part of the header.
pub trait ControlWord: Copy + core::fmt::Debug + PartialEq {
    /// Controller this trailer belongs to.
    const KIND: ControllerKind;

    /// Encoded trailer size in bytes.
    const TRAILER_LEN: usize;

    /// Decode from exactly `TRAILER_LEN` bytes.
    fn decode(trailer: &[u8]) -> Result<Self, XcbError>;

    /// Append the encoded trailer.
    fn encode_into(&self, out: &mut HeaderBytes) -> Result<(), XcbError>;
}

/// FCB control word.
///
/// ```text
/// [15:0]  bitline register width in bytes
/// [16]    readback
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FcbControl {
    /// Bytes per bitline shift (one `load` call). The FCB moves the line
    /// through a 32-bit FIFO and counts 32 bits per word, so the width must
    /// be a non-zero multiple of 4.
    pub bitline_reg_width: u16,
    /// Read the fabric instead of writing it
    pub readback: bool,
}

impl FcbControl {
    const READBACK: u32 = 1 << 16;

    /// Payload direction.
    pub const fn direction(&self) -> TransferDirection {
        if self.readback {
            TransferDirection::Readback
        } else {
            TransferDirection::Write
        }
    }
}

impl ControlWord for FcbControl {
    const KIND: ControllerKind = ControllerKind::Fcb;
    const TRAILER_LEN: usize = 4;

    fn decode(trailer: &[u8]) -> Result<Self, XcbError> {
        let word = le_u32(trailer, 0)?;
        Ok(Self {
            bitline_reg_width: (word & 0xFFFF) as u16,
            readback: word & Self::READBACK != 0,
        })
    }

    fn encode_into(&self, out: &mut HeaderBytes) -> Result<(), XcbError> {
        let mut word = u32::from(self.bitline_reg_width);
        if self.readback {
            word |= Self::READBACK;
        }
        push(out, &word.to_le_bytes())
    }
}

/// ICB control word.
///
/// ```text
/// [7:0]  cfg_cmd
/// [8]    bit_twist
/// [9]    byte_twist
/// [10]   update
/// [11]   capture
/// [12]   cmd_data
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IcbControl {
    /// Configuration command (see `icb::registers::cmd`)
    pub cfg_cmd: u8,
    /// Reverse bit order within bytes
    pub bit_twist: bool,
    /// Reverse byte order within words
    pub byte_twist: bool,
    /// Issue an update pulse at session end
    pub update: bool,
    /// Issue a capture pulse at session end
    pub capture: bool,
    /// Select the data (1) or command (0) path
    pub cmd_data: bool,
}

impl IcbControl {
    const BIT_TWIST: u32 = 1 << 8;
    const BYTE_TWIST: u32 = 1 << 9;
    const UPDATE: u32 = 1 << 10;
    const CAPTURE: u32 = 1 << 11;
    const CMD_DATA: u32 = 1 << 12;
}

impl ControlWord for IcbControl {
    const KIND: ControllerKind = ControllerKind::Icb;
    const TRAILER_LEN: usize = 4;

    fn decode(trailer: &[u8]) -> Result<Self, XcbError> {
        let word = le_u32(trailer, 0)?;
        Ok(Self {
            cfg_cmd: (word & 0xFF) as u8,
            bit_twist: word & Self::BIT_TWIST != 0,
            byte_twist: word & Self::BYTE_TWIST != 0,
            update: word & Self::UPDATE != 0,
            capture: word & Self::CAPTURE != 0,
            cmd_data: word & Self::CMD_DATA != 0,
        })
    }

    fn encode_into(&self, out: &mut HeaderBytes) -> Result<(), XcbError> {
        let flags = [
            (self.bit_twist, Self::BIT_TWIST),
            (self.byte_twist, Self::BYTE_TWIST),
            (self.update, Self::UPDATE),
            (self.capture, Self::CAPTURE),
            (self.cmd_data, Self::CMD_DATA),
        ];
        let word = flags
            .iter()
            .filter(|(on, _)| *on)
            .fold(u32::from(self.cfg_cmd), |acc, (_, bit)| acc | bit);
        push(out, &word.to_le_bytes())
    }
}

/// PCB trailer: control word (`[7:0]` cfg_cmd) then the bitstream size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PcbControl {
    /// Configuration command
    pub cfg_cmd: u8,
    /// Bitstream bytes to transfer over the whole session
    pub bitstream_size: u32,
}

impl ControlWord for PcbControl {
    const KIND: ControllerKind = ControllerKind::Pcb;
    const TRAILER_LEN: usize = 8;

    fn decode(trailer: &[u8]) -> Result<Self, XcbError> {
        Ok(Self {
            cfg_cmd: (le_u32(trailer, 0)? & 0xFF) as u8,
            bitstream_size: le_u32(trailer, 4)?,
        })
    }

    fn encode_into(&self, out: &mut HeaderBytes) -> Result<(), XcbError> {
        push(out, &u32::from(self.cfg_cmd).to_le_bytes())?;
        push(out, &self.bitstream_size.to_le_bytes())
    }
}

// ---------------------------------------------------------------------------
// Full header
// ---------------------------------------------------------------------------

/// Parsed bitstream header of one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitstreamHeader<C> {
    /// Generic prefix
    pub generic: ActionHeader,
    /// Bitstream checksum, 0 when absent
    pub checksum: u32,
    /// Controller trailer
    pub control: C,
}

/// FCB header.
pub type FcbHeader = BitstreamHeader<FcbControl>;
/// ICB header.
pub type IcbHeader = BitstreamHeader<IcbControl>;
/// PCB header.
pub type PcbHeader = BitstreamHeader<PcbControl>;

impl<C: ControlWord> BitstreamHeader<C> {
    /// Decode a header from the front of `raw`. Trailing bytes are ignored.
    pub fn parse(raw: &[u8]) -> Result<Self, XcbError> {
        if raw.is_empty() {
            return Err(XcbError::NullPointer);
        }
        let generic = ActionHeader::decode(raw)?;
        let mut cursor = ActionHeader::SIZE;

        let checksum = if generic.has_checksum() {
            let checksum = le_u32(raw, cursor)?;
            cursor = cursor.saturating_add(CHECKSUM_LEN);
            checksum
        } else {
            0
        };

        let end = cursor.saturating_add(C::TRAILER_LEN);
        let trailer = raw.get(cursor..end).ok_or(XcbError::InvalidDataLength)?;
        let control = C::decode(trailer)?;

        Ok(Self {
            generic,
            checksum,
            control,
        })
    }

    /// `true` when the header carries a checksum word.
    pub const fn has_checksum(&self) -> bool {
        self.generic.has_checksum()
    }

    /// Encoded length of this header.
    pub fn encoded_len(&self) -> usize {
        let checksum = if self.has_checksum() { CHECKSUM_LEN } else { 0 };
        ActionHeader::SIZE
            .saturating_add(checksum)
            .saturating_add(C::TRAILER_LEN)
    }

    /// Serialise to the wire layout. The checksum word is written only when
    /// the checksum flag is set in `action_enum`.
    pub fn encode(&self) -> Result<HeaderBytes, XcbError> {
        let mut out = HeaderBytes::new();
        push(&mut out, &self.generic.action_enum.to_le_bytes())?;
        push(&mut out, &self.generic.action_size.to_le_bytes())?;
        push(&mut out, &self.generic.payload_size.to_le_bytes())?;
        if self.has_checksum() {
            push(&mut out, &self.checksum.to_le_bytes())?;
        }
        self.control.encode_into(&mut out)?;
        Ok(out)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
