//! Error types
//!
//! Two tiers:
//!
//! - [`XcbError`]: the rich internal kind returned by every sequencing
//!   function. Never crosses the driver API.
//! - [`platform::DriverError`]: the coarse code returned to callers.
//!
//! The narrowing is explicit. [`XcbError::at_session_boundary`] maps every
//! kind to `Canceled` (session start/free), [`XcbError::at_transfer_boundary`]
//! keeps only "no device" and "not supported" apart from a generic I/O
//! failure (load, on/off, reset). The dropped detail survives only in the
//! log line written at the boundary.

use platform::{DriverError, RegisterError};
use thiserror::Error;

/// Internal controller error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum XcbError {
    /// Missing register block, metadata or header
    #[error("null pointer")]
    NullPointer,
    /// A control write did not read back
    #[error("register write not reflected")]
    WriteError,
    /// Readback transfer failed
    #[error("register read failed")]
    ReadError,
    /// A wordline-mode bit did not reach the requested level
    #[error("invalid bit value")]
    InvalidBitValue,
    /// Malformed input
    #[error("invalid data")]
    InvalidData,
    /// Bitline write counter disagrees with the line width
    #[error("data corrupted")]
    DataCorrupted,
    /// Hardware checksum check failed
    #[error("checksum mismatch")]
    ChecksumMatchFailed,
    /// Value out of the representable range
    #[error("value out of limit")]
    OutOfLimit,
    /// Hardware did not respond in time
    #[error("timeout")]
    Timeout,
    /// FCB configuration register programming failed
    #[error("FCB configuration failed")]
    FcbConfFailed,
    /// FCB payload transfer failed
    #[error("FCB transfer failed")]
    FcbTransferFailed,
    /// ICB configuration register programming failed
    #[error("ICB configuration failed")]
    IcbConfFailed,
    /// ICB payload transfer failed or kickoff did not self-clear
    #[error("ICB transfer failed")]
    IcbTransferFailed,
    /// PCB configuration failed
    #[error("PCB configuration failed")]
    PcbConfFailed,
    /// PCB payload transfer failed
    #[error("PCB transfer failed")]
    PcbTransferFailed,
    /// Payload or header length does not match
    #[error("invalid data length")]
    InvalidDataLength,
    /// Read data does not match
    #[error("data mismatch")]
    DataMismatch,
    /// Status register holds an unexpected value
    #[error("unexpected value")]
    UnexpectedValue,
    /// Caller-supplied parameter rejected
    #[error("invalid parameter")]
    InvalidParameter,
    /// Operation not implemented by this controller
    #[error("not supported")]
    NotSupported,
}

impl XcbError {
    /// Numeric code of the C error enumeration (0 is success).
    pub const fn code(self) -> u8 {
        match self {
            Self::NullPointer => 1,
            Self::WriteError => 2,
            Self::ReadError => 3,
            Self::InvalidBitValue => 4,
            Self::InvalidData => 5,
            Self::DataCorrupted => 6,
            Self::ChecksumMatchFailed => 7,
            Self::OutOfLimit => 8,
            Self::Timeout => 9,
            Self::FcbConfFailed => 10,
            Self::FcbTransferFailed => 11,
            Self::IcbConfFailed => 12,
            Self::IcbTransferFailed => 13,
            Self::PcbConfFailed => 14,
            Self::PcbTransferFailed => 15,
            Self::InvalidDataLength => 16,
            Self::DataMismatch => 17,
            Self::UnexpectedValue => 18,
            Self::InvalidParameter => 19,
            Self::NotSupported => 20,
        }
    }

    /// Narrowing used by `session_start` and `session_free`.
    pub const fn at_session_boundary(self) -> DriverError {
        DriverError::Canceled
    }

    /// Narrowing used by `load`, `on`, `off` and `reset`.
    pub const fn at_transfer_boundary(self) -> DriverError {
        match self {
            Self::NullPointer => DriverError::NoDevice,
            Self::NotSupported => DriverError::NotSupported,
            _ => DriverError::Io,
        }
    }
}

impl From<RegisterError> for XcbError {
    fn from(_: RegisterError) -> Self {
        Self::InvalidParameter
    }
}

/// A verified register write that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HwVerifyError {
    /// The register did not read back as written.
    #[error("register {register:#x}: expected {expected:#x} under mask {mask:#x}, read {observed:#x}")]
    Mismatch {
        /// Register byte offset
        register: usize,
        /// Bits that were checked
        mask: u32,
        /// Expected value of the checked bits
        expected: u32,
        /// Full register value read back
        observed: u32,
    },
    /// The value was refused before reaching the bus.
    #[error("register {register:#x}: {cause}")]
    Rejected {
        /// Register byte offset
        register: usize,
        /// Why the field write was refused
        cause: RegisterError,
    },
}

impl HwVerifyError {
    /// Log the failure and replace it with the error kind for the caller.
    ///
    /// A readback mismatch becomes `kind`. A rejected value is a caller bug,
    /// not a hardware fault, and always becomes
    /// [`XcbError::InvalidParameter`].
    pub fn escalate(self, kind: XcbError) -> XcbError {
        match self {
            Self::Mismatch {
                register,
                mask,
                expected,
                observed,
            } => {
                warn!(
                    "verify failed at {:#x}: expected {:#x} (mask {:#x}), read {:#x}: {}",
                    register,
                    expected,
                    mask,
                    observed,
                    kind
                );
                kind
            }
            Self::Rejected { register, cause } => {
                error!("write to {:#x} refused: {}", register, cause);
                XcbError::from(cause)
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
