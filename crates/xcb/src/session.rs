//! Controller session state machine
//!
//! All three controllers share one lifecycle:
//!
//! ```text
//!            on()                 session_start(ctx)
//! Inactive ───────► Active ◄──────────────────────── Inactive
//!    ▲                │  load(ctx, image)  (repeatable)
//!    │                ▼
//!    └──────── session_free(ctx) / off()
//! ```
//!
//! [`XcbDevice`] owns one controller (and through it the only handle to its
//! register block) plus the parsed header of the open session. Holding the
//! header is what "session open" means: a second `session_start` reports
//! `Busy`.
//!
//! The device turns `Active` only once `config_begin` succeeds. Payload is
//! accepted only while the device is `Active` with a begun session; `load`
//! reports `NoDevice` otherwise. `off()` ends the begun state, so a powered
//! down block never receives payload until the session is freed and started
//! again.
//!
//! # Error narrowing
//!
//! Controllers return [`XcbError`]. At this boundary the kind is logged and
//! narrowed: `session_start`/`session_free` always report
//! [`DriverError::Canceled`], the other operations go through
//! [`XcbError::at_transfer_boundary`].
//!
//! # Teardown
//!
//! `session_free` runs `config_end`, then drops the header, marks the device
//! inactive and clears the caller's context, in that order, whatever
//! `config_end` returned. Callers must call it after every `session_start`,
//! successful or not: the header is kept on a failed begin for exactly that
//! reason.

use platform::{
    ControllerKind, DriverError, FpgaManager, FpgaStatus, SessionContext, TransferInfo,
};

use crate::error::XcbError;
use crate::header::{BitstreamHeader, ControlWord};

/// Controller-specific half of a session.
///
/// Implemented by [`crate::fcb::Fcb`], [`crate::icb::Icb`] and
/// [`crate::pcb::Pcb`]. Every method returns the rich internal error.
pub trait ConfigController {
    /// Header trailer of this controller.
    type Control: ControlWord;

    /// Program the controller for a session described by `header`.
    fn config_begin(&mut self, header: &BitstreamHeader<Self::Control>) -> Result<(), XcbError>;

    /// Move one payload block and run the post-transfer sequence.
    fn load(
        &mut self,
        header: &BitstreamHeader<Self::Control>,
        ctx: &mut SessionContext<'_>,
        image: &mut [u8],
    ) -> Result<(), XcbError>;

    /// Finish the session.
    fn config_end(&mut self, header: &BitstreamHeader<Self::Control>) -> Result<(), XcbError>;

    /// Transfer parameters announced by `header`.
    fn info(header: &BitstreamHeader<Self::Control>) -> TransferInfo;

    /// Power the block up.
    fn power_on(&mut self) -> Result<(), XcbError> {
        Ok(())
    }

    /// Power the block down.
    fn power_off(&mut self) -> Result<(), XcbError> {
        Ok(())
    }

    /// Return the block to its reset state.
    fn reset(&mut self) -> Result<(), XcbError> {
        Err(XcbError::NotSupported)
    }
}

/// A configuration controller behind the driver API.
pub struct XcbDevice<C: ConfigController> {
    controller: C,
    status: FpgaStatus,
    header: Option<BitstreamHeader<C::Control>>,
    begun: bool,
}

impl<C: ConfigController> XcbDevice<C> {
    const KIND: ControllerKind = <C::Control as ControlWord>::KIND;

    /// Wrap `controller`. The device starts inactive with no session.
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            status: FpgaStatus::Inactive,
            header: None,
            begun: false,
        }
    }

    /// Which controller this is.
    pub fn kind(&self) -> ControllerKind {
        Self::KIND
    }

    /// Header of the open session.
    pub fn header(&self) -> Option<&BitstreamHeader<C::Control>> {
        self.header.as_ref()
    }

    /// `true` between `session_start` and `session_free`.
    pub fn session_open(&self) -> bool {
        self.header.is_some()
    }

    /// `true` once `config_begin` of the open session succeeded.
    pub fn session_begun(&self) -> bool {
        self.begun
    }

    /// The wrapped controller.
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// The wrapped controller, mutably.
    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    /// Unwrap the controller.
    pub fn into_inner(self) -> C {
        self.controller
    }

    fn session_error(op: &'static str, err: XcbError) -> DriverError {
        error!("{} {} failed: {}", Self::KIND, op, err);
        err.at_session_boundary()
    }

    fn transfer_error(op: &'static str, err: XcbError) -> DriverError {
        error!("{} {} failed: {}", Self::KIND, op, err);
        err.at_transfer_boundary()
    }
}

impl<C: ConfigController> FpgaManager for XcbDevice<C> {
    fn status(&self) -> FpgaStatus {
        self.status
    }

    fn info(&self) -> TransferInfo {
        self.header.as_ref().map(C::info).unwrap_or_default()
    }

    fn load(&mut self, ctx: &mut SessionContext<'_>, image: &mut [u8]) -> Result<(), DriverError> {
        let Some(header) = self.header.as_ref() else {
            return Err(Self::transfer_error("load", XcbError::NullPointer));
        };
        if ctx.device() != Some(Self::KIND) {
            return Err(Self::transfer_error("load", XcbError::NullPointer));
        }
        if !self.begun || self.status != FpgaStatus::Active {
            return Err(Self::transfer_error("load", XcbError::NullPointer));
        }
        trace!("{} load {} bytes", Self::KIND, image.len());
        self.controller
            .load(header, ctx, image)
            .map_err(|err| Self::transfer_error("load", err))
    }

    fn on(&mut self) -> Result<(), DriverError> {
        self.controller
            .power_on()
            .map_err(|err| Self::transfer_error("on", err))?;
        self.status = FpgaStatus::Active;
        Ok(())
    }

    fn off(&mut self) -> Result<(), DriverError> {
        self.controller
            .power_off()
            .map_err(|err| Self::transfer_error("off", err))?;
        self.status = FpgaStatus::Inactive;
        self.begun = false;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DriverError> {
        self.controller
            .reset()
            .map_err(|err| Self::transfer_error("reset", err))
    }

    fn session_start(&mut self, ctx: &mut SessionContext<'_>) -> Result<(), DriverError> {
        if self.header.is_some() {
            warn!("{} session already open", Self::KIND);
            return Err(DriverError::Busy);
        }
        let metadata = ctx
            .metadata()
            .ok_or(XcbError::NullPointer)
            .map_err(|err| Self::session_error("session start", err))?;
        let header = BitstreamHeader::<C::Control>::parse(metadata)
            .map_err(|err| Self::session_error("header parse", err))?;

        debug!(
            "{} session: action {:#x}, payload {} bytes, checksum {}",
            Self::KIND,
            header.generic.action_enum,
            header.generic.payload_size,
            header.has_checksum()
        );

        ctx.attach(Self::KIND);
        self.header = Some(header);
        self.begun = false;

        self.controller
            .config_begin(&header)
            .map_err(|err| Self::session_error("config begin", err))?;
        self.begun = true;
        self.status = FpgaStatus::Active;
        Ok(())
    }

    fn session_free(&mut self, ctx: &mut SessionContext<'_>) -> Result<(), DriverError> {
        let result = match self.header.take() {
            Some(header) => self.controller.config_end(&header),
            None => Err(XcbError::NullPointer),
        };
        self.begun = false;
        self.status = FpgaStatus::Inactive;
        ctx.clear();
        result.map_err(|err| Self::session_error("config end", err))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
