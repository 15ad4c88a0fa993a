//! FPGA manager driver API
//!
//! The surface every configuration controller exposes to the rest of the
//! system: status, transfer parameters, payload load, power and reset
//! control, and the session bracket (`session_start` / `session_free`).
//!
//! # Errors
//!
//! Failures at this surface are coarse on purpose. Controllers keep a rich
//! internal error kind, log it, and narrow it to a [`DriverError`] when it
//! crosses the API. [`DriverError::errno`] gives the negative errno value
//! expected by C callers.
//!
//! # Session context
//!
//! [`SessionContext`] is caller-owned. The caller sets the metadata blob
//! before `session_start`; the controller attaches itself and records the
//! route of each transfer; `session_free` clears it so it cannot be reused
//! without being populated again.

use crate::transfer::TransferRoute;

/// Controller engagement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FpgaStatus {
    /// A session is open
    Active,
    /// No session (initial state)
    #[default]
    Inactive,
}

/// The three configuration controller IP blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerKind {
    /// Fabric configuration block
    Fcb,
    /// Interconnect configuration block
    Icb,
    /// Peripheral configuration block
    Pcb,
}

impl ControllerKind {
    /// Short uppercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fcb => "FCB",
            Self::Icb => "ICB",
            Self::Pcb => "PCB",
        }
    }
}

impl core::fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload direction of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferDirection {
    /// Bits go into the fabric
    #[default]
    Write,
    /// Bits are read out of the fabric
    Readback,
}

/// Transfer parameters of the open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferInfo {
    /// Payload direction
    pub direction: TransferDirection,
    /// Bytes expected per `load` call
    pub block_size: u32,
    /// Total payload bytes of the session
    pub total_size: u32,
}

/// Coarse driver-API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// Session bracket failed (details are in the log)
    Canceled,
    /// Payload or control operation failed
    Io,
    /// Operation not implemented by this controller
    NotSupported,
    /// No register block, metadata or session
    NoDevice,
    /// A session is already open
    Busy,
}

impl DriverError {
    /// Negative errno value for C callers.
    pub const fn errno(self) -> i32 {
        match self {
            Self::Canceled => -140,
            Self::Io => -5,
            Self::NotSupported => -88,
            Self::NoDevice => -19,
            Self::Busy => -16,
        }
    }
}

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Self::Canceled => "operation canceled",
            Self::Io => "I/O error",
            Self::NotSupported => "operation not supported",
            Self::NoDevice => "no such device",
            Self::Busy => "device busy",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DriverError {}

/// Caller-owned transfer context for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext<'a> {
    metadata: Option<&'a [u8]>,
    device: Option<ControllerKind>,
    route: Option<TransferRoute>,
}

impl<'a> SessionContext<'a> {
    /// Context carrying the raw header blob.
    #[must_use]
    pub const fn new(metadata: &'a [u8]) -> Self {
        Self {
            metadata: Some(metadata),
            device: None,
            route: None,
        }
    }

    /// Context with nothing set.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            metadata: None,
            device: None,
            route: None,
        }
    }

    /// Replace the header blob (re-populating a cleared context).
    pub fn set_metadata(&mut self, metadata: &'a [u8]) {
        self.metadata = Some(metadata);
    }

    /// Header blob, if set.
    pub fn metadata(&self) -> Option<&'a [u8]> {
        self.metadata
    }

    /// Controller attached by `session_start`.
    pub fn device(&self) -> Option<ControllerKind> {
        self.device
    }

    /// Attach a controller.
    pub fn attach(&mut self, device: ControllerKind) {
        self.device = Some(device);
    }

    /// Route of the last transfer.
    pub fn route(&self) -> Option<TransferRoute> {
        self.route
    }

    /// Record the route of the transfer about to run.
    pub fn set_route(&mut self, route: TransferRoute) {
        self.route = Some(route);
    }

    /// Invalidate the whole context.
    pub fn clear(&mut self) {
        *self = Self::empty();
    }
}

/// Driver API implemented by every configuration controller.
pub trait FpgaManager {
    /// Current engagement state.
    fn status(&self) -> FpgaStatus;

    /// Transfer parameters of the open session (zeroed when none).
    fn info(&self) -> TransferInfo;

    /// Move one payload block. `image` is read for writes and filled for
    /// readback.
    fn load(&mut self, ctx: &mut SessionContext<'_>, image: &mut [u8]) -> Result<(), DriverError>;

    /// Power the controller up.
    fn on(&mut self) -> Result<(), DriverError>;

    /// Power the controller down.
    fn off(&mut self) -> Result<(), DriverError>;

    /// Return the controller to its reset state.
    fn reset(&mut self) -> Result<(), DriverError>;

    /// Parse the header in `ctx` and begin a configuration session.
    fn session_start(&mut self, ctx: &mut SessionContext<'_>) -> Result<(), DriverError>;

    /// End the session and release `ctx`. Always leaves the controller
    /// inactive and `ctx` cleared, even when it reports an error.
    fn session_free(&mut self, ctx: &mut SessionContext<'_>) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::Endpoint;

    #[test]
    fn test_errno_values() {
        assert_eq!(DriverError::Canceled.errno(), -140);
        assert_eq!(DriverError::Io.errno(), -5);
        assert_eq!(DriverError::NotSupported.errno(), -88);
        assert_eq!(DriverError::NoDevice.errno(), -19);
        assert_eq!(DriverError::Busy.errno(), -16);
    }

    #[test]
    fn test_context_clear_drops_everything() {
        let blob = [0u8; 12];
        let mut ctx = SessionContext::new(&blob);
        ctx.attach(ControllerKind::Icb);
        ctx.set_route(TransferRoute {
            src: Endpoint::Image { len: 4 },
            dst: Endpoint::Register(0x18),
        });
        assert_eq!(ctx.device(), Some(ControllerKind::Icb));

        ctx.clear();
        assert_eq!(ctx, SessionContext::empty());
        assert!(ctx.metadata().is_none());
        assert!(ctx.device().is_none());
        assert!(ctx.route().is_none());
    }

    #[test]
    fn test_status_defaults_inactive() {
        assert_eq!(FpgaStatus::default(), FpgaStatus::Inactive);
        assert_eq!(TransferInfo::default().total_size, 0);
    }
}
