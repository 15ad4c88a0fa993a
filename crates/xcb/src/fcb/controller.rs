//! FCB session sequencing
//!
//! # Config begin
//!
//! 0. The bitline width must be a non-zero multiple of the 32-bit FIFO word,
//!    otherwise the session is refused before any register access.
//! 1. Clear STATUS (verified).
//! 2. Strobe BL_CLR and check the bitline write counter reads zero.
//! 3. Write sessions with a checksum: program CHKSUM_WORD and set
//!    CHKSUM_PRECHECK_EN (each verified).
//! 4. Clear CFG_DONE (verified).
//! 5. Readback: WL_CNT = 0, `force(false)`, `early(true)`.
//!    Write: `early(true)`, `force(true)`.
//!
//! # Load (one bitline per call)
//!
//! The image must be exactly `bitline_reg_width` bytes. BL_GATING is raised
//! around the bulk transfer and dropped again whatever the transfer
//! returned. Then:
//!
//! - write: `both()`, `advance(false)`, check BL_WR_CNT == width * 8, clear
//!   the counter for the next line;
//! - readback: `advance(true)`, `both()`, increment WL_RD_CNT.
//!
//! Readback always strobes both halves; `even()`/`odd()` stay available on
//! the sequencer but are not used here.
//!
//! # Config end
//!
//! Checksum status (write sessions with precheck), then CFG_DONE. Clearing
//! CHKSUM_PRECHECK_EN runs last, unconditionally.

use embedded_hal::delay::DelayNs;
use platform::{
    read_reg_bit, read_reg_val, Field, RegisterBus, SessionContext, TransferHandler,
    TransferInfo, TransferRequest,
};

use super::registers::{
    BL_GATING, CFG_DONE, CHKSUM_OK, CHKSUM_PRECHECK_EN, REG_BL_CLR, REG_BL_RX, REG_BL_TX,
    REG_BL_WR_CNT, REG_CFG_CTL, REG_CHKSUM_WORD, REG_STATUS, REG_WL_CNT, REG_WL_RD_CNT,
    STATUS_ALL, WL_COUNT,
};
use super::sequencer::FcbSequencer;
use crate::config::FcbConfig;
use crate::error::XcbError;
use crate::header::{FcbControl, FcbHeader};
use crate::session::ConfigController;
use crate::verify::{expect_bits, verified_write};

/// Bitline FIFO word size in bytes.
const BL_WORD_BYTES: u16 = 4;

/// FCB controller: wordline sequencer plus the bulk transfer engine.
pub struct Fcb<B, T, D> {
    seq: FcbSequencer<B, D>,
    transfer: T,
}

impl<B, T, D> Fcb<B, T, D>
where
    B: RegisterBus,
    T: TransferHandler<B>,
    D: DelayNs,
{
    /// Controller over the FCB register block `bus`.
    pub fn new(bus: B, transfer: T, delay: D, config: FcbConfig) -> Self {
        Self {
            seq: FcbSequencer::new(bus, delay, config),
            transfer,
        }
    }

    /// Wordline primitives, for bring-up and tests.
    pub fn sequencer(&mut self) -> &mut FcbSequencer<B, D> {
        &mut self.seq
    }

    /// Release the bus, transfer engine and delay.
    pub fn into_parts(self) -> (B, T, D) {
        let (bus, delay) = self.seq.into_parts();
        (bus, self.transfer, delay)
    }

    fn verify(
        &mut self,
        reg: usize,
        field: Field,
        value: u32,
        kind: XcbError,
    ) -> Result<(), XcbError> {
        verified_write(self.seq.bus_mut(), reg, field, value).map_err(|e| e.escalate(kind))
    }

    fn clear_write_counter(&mut self) -> Result<(), XcbError> {
        let bus = self.seq.bus_mut();
        bus.write(REG_BL_CLR, 1);
        expect_bits(bus, REG_BL_WR_CNT, u32::MAX, 0).map_err(|e| e.escalate(XcbError::WriteError))
    }

    fn after_write(&mut self, width: u16) -> Result<(), XcbError> {
        self.seq.both()?;
        self.seq.advance(false)?;

        let expected = u32::from(width).saturating_mul(8);
        let shifted = self.seq.bus_mut().read(REG_BL_WR_CNT);
        if shifted != expected {
            error!("FCB bitline shifted {} bits, expected {}", shifted, expected);
            return Err(XcbError::DataCorrupted);
        }
        self.clear_write_counter()
    }

    fn after_read(&mut self) -> Result<(), XcbError> {
        self.seq.advance(true)?;
        self.seq.both()?;

        let lines = read_reg_val(self.seq.bus_mut(), REG_WL_RD_CNT, WL_COUNT);
        let next = lines.wrapping_add(1) & WL_COUNT.value_mask();
        self.verify(REG_WL_RD_CNT, WL_COUNT, next, XcbError::WriteError)
    }

    /// Return the wordline latch to idle and disconnect the bitline register.
    fn idle(&mut self) -> Result<(), XcbError> {
        self.seq.idle()?;
        self.verify(REG_CFG_CTL, BL_GATING, 0, XcbError::WriteError)
    }
}

impl<B, T, D> ConfigController for Fcb<B, T, D>
where
    B: RegisterBus,
    T: TransferHandler<B>,
    D: DelayNs,
{
    type Control = FcbControl;

    fn config_begin(&mut self, header: &FcbHeader) -> Result<(), XcbError> {
        let ctl = header.control;
        let width = ctl.bitline_reg_width;
        if width == 0 || width.checked_rem(BL_WORD_BYTES) != Some(0) {
            error!("FCB bitline width {} is not a whole number of FIFO words", width);
            return Err(XcbError::InvalidDataLength);
        }

        self.verify(REG_STATUS, STATUS_ALL, 0, XcbError::WriteError)?;
        self.clear_write_counter()?;

        if !ctl.readback && header.has_checksum() {
            self.verify(REG_CHKSUM_WORD, Field::WORD, header.checksum, XcbError::FcbConfFailed)?;
            self.verify(REG_CFG_CTL, CHKSUM_PRECHECK_EN, 1, XcbError::FcbConfFailed)?;
        }

        self.verify(REG_CFG_CTL, CFG_DONE, 0, XcbError::WriteError)?;

        if ctl.readback {
            self.verify(REG_WL_CNT, WL_COUNT, 0, XcbError::WriteError)?;
            self.seq.force(false)?;
            self.seq.early(true)
        } else {
            self.seq.early(true)?;
            self.seq.force(true)
        }
    }

    fn load(
        &mut self,
        header: &FcbHeader,
        ctx: &mut SessionContext<'_>,
        image: &mut [u8],
    ) -> Result<(), XcbError> {
        let width = header.control.bitline_reg_width;
        if image.len() != usize::from(width) {
            error!("FCB line of {} bytes, bitline register is {}", image.len(), width);
            return Err(XcbError::InvalidDataLength);
        }
        let readback = header.control.readback;

        let request = if readback {
            TransferRequest::Read {
                src: REG_BL_RX,
                dst: image,
            }
        } else {
            TransferRequest::Write {
                src: image,
                dst: REG_BL_TX,
            }
        };
        ctx.set_route(request.route());

        self.verify(REG_CFG_CTL, BL_GATING, 1, XcbError::WriteError)?;
        let moved = self.transfer.transfer(self.seq.bus_mut(), request);
        let ungated = self.verify(REG_CFG_CTL, BL_GATING, 0, XcbError::WriteError);

        if moved.is_err() {
            error!("FCB bulk transfer failed");
            return Err(if readback {
                XcbError::ReadError
            } else {
                XcbError::FcbTransferFailed
            });
        }
        ungated?;

        if readback {
            self.after_read()
        } else {
            self.after_write(width)
        }
    }

    fn config_end(&mut self, header: &FcbHeader) -> Result<(), XcbError> {
        let precheck = !header.control.readback && header.has_checksum();

        let checked = if precheck && !read_reg_bit(self.seq.bus_mut(), REG_STATUS, CHKSUM_OK.offset())
        {
            error!("FCB checksum {:#x} did not match", header.checksum);
            Err(XcbError::ChecksumMatchFailed)
        } else {
            Ok(())
        };
        let done =
            checked.and_then(|()| self.verify(REG_CFG_CTL, CFG_DONE, 1, XcbError::WriteError));

        let cleanup = self.verify(REG_CFG_CTL, CHKSUM_PRECHECK_EN, 0, XcbError::WriteError);
        done.and(cleanup)
    }

    fn info(header: &FcbHeader) -> TransferInfo {
        TransferInfo {
            direction: header.control.direction(),
            block_size: u32::from(header.control.bitline_reg_width),
            total_size: header.generic.payload_size,
        }
    }

    fn reset(&mut self) -> Result<(), XcbError> {
        self.idle()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
