//! Peripheral configuration block
//!
//! Only the session shell lives here. Programming the PCB itself is the job
//! of a board-specific [`PcbSequencer`]; the payload goes through the same
//! [`TransferHandler`] the other blocks use, into a data port the board
//! names. The shell tracks the payload against the header's bitstream size
//! and reports `NotSupported` for power and reset control.

use platform::{
    RegisterBus, SessionContext, TransferDirection, TransferHandler, TransferInfo,
    TransferRequest,
};

use crate::error::XcbError;
use crate::header::{PcbControl, PcbHeader};
use crate::session::{ConfigController, XcbDevice};

/// Board-specific PCB programming.
pub trait PcbSequencer {
    /// Prepare the block for the bitstream described by `header`.
    fn config_begin(&mut self, header: &PcbHeader) -> Result<(), XcbError>;

    /// Finish the session and check the block accepted the bitstream.
    fn config_end(&mut self, header: &PcbHeader) -> Result<(), XcbError>;
}

impl<S: PcbSequencer + ?Sized> PcbSequencer for &mut S {
    fn config_begin(&mut self, header: &PcbHeader) -> Result<(), XcbError> {
        (**self).config_begin(header)
    }

    fn config_end(&mut self, header: &PcbHeader) -> Result<(), XcbError> {
        (**self).config_end(header)
    }
}

/// PCB session shell.
pub struct Pcb<S, B, T> {
    sequencer: S,
    bus: B,
    transfer: T,
    port: usize,
    loaded: u32,
}

impl<S, B, T> Pcb<S, B, T>
where
    S: PcbSequencer,
    B: RegisterBus,
    T: TransferHandler<B>,
{
    /// Shell streaming the payload into register `port` of `bus`.
    pub fn new(sequencer: S, bus: B, transfer: T, port: usize) -> Self {
        Self {
            sequencer,
            bus,
            transfer,
            port,
            loaded: 0,
        }
    }

    /// Payload bytes moved since the last `config_begin`.
    pub fn loaded(&self) -> u32 {
        self.loaded
    }

    /// The board sequencer.
    pub fn sequencer(&self) -> &S {
        &self.sequencer
    }
}

impl<S, B, T> ConfigController for Pcb<S, B, T>
where
    S: PcbSequencer,
    B: RegisterBus,
    T: TransferHandler<B>,
{
    type Control = PcbControl;

    fn config_begin(&mut self, header: &PcbHeader) -> Result<(), XcbError> {
        self.loaded = 0;
        self.sequencer.config_begin(header)
    }

    fn load(
        &mut self,
        header: &PcbHeader,
        ctx: &mut SessionContext<'_>,
        image: &mut [u8],
    ) -> Result<(), XcbError> {
        let size = header.control.bitstream_size;
        let total = u32::try_from(image.len())
            .ok()
            .filter(|&len| len > 0)
            .and_then(|len| self.loaded.checked_add(len))
            .filter(|&total| total <= size)
            .ok_or(XcbError::InvalidDataLength)?;

        let request = TransferRequest::Write {
            src: image,
            dst: self.port,
        };
        ctx.set_route(request.route());
        if self.transfer.transfer(&mut self.bus, request).is_err() {
            error!("PCB bitstream transfer failed at byte {}", self.loaded);
            return Err(XcbError::PcbTransferFailed);
        }
        self.loaded = total;
        Ok(())
    }

    fn config_end(&mut self, header: &PcbHeader) -> Result<(), XcbError> {
        if self.loaded != header.control.bitstream_size {
            warn!("PCB session ends after {} of {} bytes", self.loaded, header.control.bitstream_size);
        }
        self.sequencer.config_end(header)
    }

    fn info(header: &PcbHeader) -> TransferInfo {
        TransferInfo {
            direction: TransferDirection::Write,
            block_size: header.control.bitstream_size,
            total_size: header.control.bitstream_size,
        }
    }

    fn power_on(&mut self) -> Result<(), XcbError> {
        Err(XcbError::NotSupported)
    }

    fn power_off(&mut self) -> Result<(), XcbError> {
        Err(XcbError::NotSupported)
    }
}

/// PCB behind the driver API.
pub type PcbDevice<S, B, T> = XcbDevice<Pcb<S, B, T>>;

// ─── Tests ───────────────────────────────────────────────────────────────────
