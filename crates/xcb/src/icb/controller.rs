//! ICB session sequencing
//!
//! # Config begin
//!
//! 1. Soft reset (SOFT_RESET_N low, verified high again), once per boot and
//!    never for a post-checksum readback.
//! 2. CFG_CMD: command, bit twist, byte twist (each verified).
//! 3. Checksummed write commands: program CHKSUM_WORD and set CHKSUM_EN.
//!    Every other command clears CHKSUM_EN.
//! 4. CHAIN_LENGTH = payload bytes * 8 (`OutOfLimit` if that overflows).
//! 5. CMD_DATA from the header, CFG_DONE cleared, CFG_KICKOFF raised (each
//!    verified).
//!
//! Register programming failures report `IcbConfFailed`, control bit
//! failures `WriteError`.
//!
//! # Load (any number of chunks)
//!
//! Chunks must be non-empty and may not push the running total past the
//! payload size. Write commands push through TX, read commands pull from
//! RX. After each chunk the shift FSM is polled until idle.
//!
//! # Config end
//!
//! 1. Checksummed writes: CHKSUM_OK must be set.
//! 2. CFG_KICKOFF must have self-cleared.
//! 3. CFG_DONE must be set, except after a post-checksum readback.
//! 4. Capture pulse, then update pulse, as requested by the header. Each
//!    pulse holds its bit for the pulse delay and drops it together with
//!    CMD_DATA.

use core::hint::spin_loop;

use embedded_hal::delay::DelayNs;
use platform::{
    read_reg_bit, write_reg_val, Field, RegisterBus, SessionContext, TransferDirection,
    TransferHandler, TransferInfo, TransferRequest,
};

use super::registers::{
    cmd, BIT_TWIST, BYTE_TWIST, CAPTURE, CFG_DONE, CFG_KICKOFF, CHKSUM_EN, CHKSUM_OK, CMD,
    CMD_DATA, FSM_BUSY, REG_CFG_CMD, REG_CFG_CTL, REG_CHAIN_LENGTH, REG_CHKSUM_WORD, REG_RX,
    REG_SHIFT_STATUS, REG_STATUS, REG_TX, SOFT_RESET_N, UPDATE,
};
use crate::config::IcbConfig;
use crate::error::XcbError;
use crate::header::{IcbControl, IcbHeader};
use crate::session::ConfigController;
use crate::verify::{expect_bits, verified_set, verified_write};

/// ICB controller.
pub struct Icb<B, T, D> {
    bus: B,
    transfer: T,
    delay: D,
    pulse_delay_us: u32,
    soft_reset_done: bool,
    loaded: u32,
}

impl<B, T, D> Icb<B, T, D>
where
    B: RegisterBus,
    T: TransferHandler<B>,
    D: DelayNs,
{
    /// Controller over the ICB register block `bus`.
    pub fn new(bus: B, transfer: T, delay: D, config: IcbConfig) -> Self {
        Self {
            bus,
            transfer,
            delay,
            pulse_delay_us: config.pulse_delay_us,
            soft_reset_done: false,
            loaded: 0,
        }
    }

    /// `true` once the block has been soft-reset since construction.
    pub fn soft_reset_done(&self) -> bool {
        self.soft_reset_done
    }

    /// Payload bytes moved since the last `config_begin`.
    pub fn loaded(&self) -> u32 {
        self.loaded
    }

    /// Release the bus, transfer engine and delay.
    pub fn into_parts(self) -> (B, T, D) {
        (self.bus, self.transfer, self.delay)
    }

    fn verify(
        &mut self,
        reg: usize,
        field: Field,
        value: u32,
        kind: XcbError,
    ) -> Result<(), XcbError> {
        verified_write(&mut self.bus, reg, field, value).map_err(|e| e.escalate(kind))
    }

    /// Pulse SOFT_RESET_N low and check it reads back high.
    pub fn soft_reset(&mut self) -> Result<(), XcbError> {
        write_reg_val(&mut self.bus, REG_CFG_CTL, SOFT_RESET_N, 0)?;
        self.verify(REG_CFG_CTL, SOFT_RESET_N, 1, XcbError::WriteError)?;
        self.soft_reset_done = true;
        debug!("ICB soft reset");
        Ok(())
    }

    fn config_registers(&mut self, header: &IcbHeader) -> Result<(), XcbError> {
        let ctl = header.control;
        let conf = XcbError::IcbConfFailed;

        self.verify(REG_CFG_CMD, CMD, u32::from(ctl.cfg_cmd), conf)?;
        self.verify(REG_CFG_CMD, BIT_TWIST, u32::from(ctl.bit_twist), conf)?;
        self.verify(REG_CFG_CMD, BYTE_TWIST, u32::from(ctl.byte_twist), conf)?;

        if checksum_used(header) {
            self.verify(REG_CHKSUM_WORD, Field::WORD, header.checksum, conf)?;
            self.verify(REG_CFG_CTL, CHKSUM_EN, 1, conf)?;
        } else {
            self.verify(REG_CFG_CTL, CHKSUM_EN, 0, conf)?;
        }

        let chain_bits = header.generic.payload_size.checked_mul(8).ok_or_else(|| {
            error!("ICB chain of {} bytes overflows the length register", header.generic.payload_size);
            XcbError::OutOfLimit
        })?;
        self.verify(REG_CHAIN_LENGTH, Field::WORD, chain_bits, conf)
    }

    /// Set `bit`, hold it for the pulse width, then drop it together with
    /// CMD_DATA.
    fn pulse(&mut self, bit: Field) -> Result<(), XcbError> {
        verified_set(&mut self.bus, REG_CFG_CTL, bit)
            .map_err(|e| e.escalate(XcbError::WriteError))?;
        self.delay.delay_us(self.pulse_delay_us);

        let low = bit.mask() | CMD_DATA.mask();
        let raw = self.bus.read(REG_CFG_CTL);
        self.bus.write(REG_CFG_CTL, raw & !low);
        expect_bits(&mut self.bus, REG_CFG_CTL, low, 0).map_err(|e| e.escalate(XcbError::WriteError))
    }

    /// Spin until the shift engine is idle.
    ///
    /// Unbounded: a shift engine that never goes idle hangs the caller.
    fn wait_idle(&mut self) {
        while read_reg_bit(&mut self.bus, REG_SHIFT_STATUS, FSM_BUSY.offset()) {
            spin_loop();
        }
    }
}

/// The checksum word is programmed and checked for checksummed write modes.
fn checksum_used(header: &IcbHeader) -> bool {
    header.has_checksum() && !cmd::is_read(header.control.cfg_cmd)
}

impl<B, T, D> ConfigController for Icb<B, T, D>
where
    B: RegisterBus,
    T: TransferHandler<B>,
    D: DelayNs,
{
    type Control = IcbControl;

    fn config_begin(&mut self, header: &IcbHeader) -> Result<(), XcbError> {
        let ctl = header.control;

        if !self.soft_reset_done && ctl.cfg_cmd != cmd::READ_POSTCHKSUM {
            self.soft_reset()?;
        }
        self.config_registers(header)?;

        self.verify(REG_CFG_CTL, CMD_DATA, u32::from(ctl.cmd_data), XcbError::WriteError)?;
        self.verify(REG_CFG_CTL, CFG_DONE, 0, XcbError::WriteError)?;
        self.verify(REG_CFG_CTL, CFG_KICKOFF, 1, XcbError::WriteError)?;
        self.loaded = 0;
        Ok(())
    }

    fn load(
        &mut self,
        header: &IcbHeader,
        ctx: &mut SessionContext<'_>,
        image: &mut [u8],
    ) -> Result<(), XcbError> {
        let total = u32::try_from(image.len())
            .ok()
            .filter(|&len| len > 0)
            .and_then(|len| self.loaded.checked_add(len))
            .filter(|&total| total <= header.generic.payload_size)
            .ok_or_else(|| {
                error!(
                    "ICB chunk of {} bytes after {} of {}",
                    image.len(),
                    self.loaded,
                    header.generic.payload_size
                );
                XcbError::InvalidDataLength
            })?;

        let request = if cmd::is_read(header.control.cfg_cmd) {
            TransferRequest::Read {
                src: REG_RX,
                dst: image,
            }
        } else {
            TransferRequest::Write {
                src: image,
                dst: REG_TX,
            }
        };
        ctx.set_route(request.route());

        if self.transfer.transfer(&mut self.bus, request).is_err() {
            error!("ICB chain transfer failed");
            return Err(XcbError::IcbTransferFailed);
        }
        self.wait_idle();
        self.loaded = total;
        Ok(())
    }

    fn config_end(&mut self, header: &IcbHeader) -> Result<(), XcbError> {
        let ctl = header.control;

        if checksum_used(header) && !read_reg_bit(&mut self.bus, REG_STATUS, CHKSUM_OK.offset()) {
            error!("ICB checksum {:#x} did not match", header.checksum);
            return Err(XcbError::ChecksumMatchFailed);
        }
        if read_reg_bit(&mut self.bus, REG_CFG_CTL, CFG_KICKOFF.offset()) {
            error!("ICB kickoff did not self-clear");
            return Err(XcbError::IcbTransferFailed);
        }
        if ctl.cfg_cmd != cmd::READ_POSTCHKSUM
            && !read_reg_bit(&mut self.bus, REG_CFG_CTL, CFG_DONE.offset())
        {
            error!("ICB done not raised after command {}", ctl.cfg_cmd);
            return Err(XcbError::UnexpectedValue);
        }

        if ctl.capture {
            self.pulse(CAPTURE)?;
        }
        if ctl.update {
            self.pulse(UPDATE)?;
        }
        Ok(())
    }

    fn info(header: &IcbHeader) -> TransferInfo {
        TransferInfo {
            direction: if cmd::is_read(header.control.cfg_cmd) {
                TransferDirection::Readback
            } else {
                TransferDirection::Write
            },
            block_size: header.generic.payload_size,
            total_size: header.generic.payload_size,
        }
    }

    /// Soft reset regardless of whether one already ran.
    fn reset(&mut self) -> Result<(), XcbError> {
        self.soft_reset()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::header::ActionHeader;
    use crate::icb::registers::REGISTER_MAP;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use platform::mocks::{FailingTransfer, SimBus, SimDelay};
    use platform::{Endpoint, PioTransfer};

    fn control(cfg_cmd: u8) -> IcbControl {
        IcbControl {
            cfg_cmd,
            bit_twist: false,
            byte_twist: false,
            update: false,
            capture: false,
            cmd_data: false,
        }
    }

    fn header(control: IcbControl, payload_size: u32, checksum: Option<u32>) -> IcbHeader {
        IcbHeader {
            generic: ActionHeader {
                action_enum: if checksum.is_some() { ActionHeader::CHECKSUM_PRESENT } else { 0 },
                action_size: 16,
                payload_size,
            },
            checksum: checksum.unwrap_or(0),
            control,
        }
    }

    /// Simulated block whose shift engine finishes on the first FIFO access.
    fn block() -> SimBus {
        let bus = SimBus::new(REGISTER_MAP);
        for fifo in [REG_TX, REG_RX] {
            bus.on_transfer(fifo, REG_CFG_CTL, CFG_DONE.mask(), CFG_KICKOFF.mask());
        }
        bus
    }

    fn icb(bus: &SimBus) -> Icb<SimBus, PioTransfer, NoopDelay> {
        Icb::new(bus.clone(), PioTransfer, NoopDelay::new(), IcbConfig::default())
    }

    fn timed(bus: &SimBus) -> Icb<SimBus, PioTransfer, SimDelay> {
        Icb::new(bus.clone(), PioTransfer, bus.delay(), IcbConfig::default())
    }

    /// Writes to CFG_CTL that raise `bit`.
    fn rises(bus: &SimBus, bit: Field) -> usize {
        let mut prev = 0;
        bus.writes_to(REG_CFG_CTL)
            .into_iter()
            .filter(|&value| {
                let rose = value & bit.mask() != 0 && prev & bit.mask() == 0;
                prev = value;
                rose
            })
            .count()
    }

    /// Writes to CFG_CTL that drop `bit`, as the full written values.
    fn falls(bus: &SimBus, bit: Field) -> Vec<u32> {
        let mut prev = 0;
        bus.writes_to(REG_CFG_CTL)
            .into_iter()
            .filter(|&value| {
                let fell = value & bit.mask() == 0 && prev & bit.mask() != 0;
                prev = value;
                fell
            })
            .collect()
    }

    // ── Test A: config begin ─────────────────────────────────────────────────

    #[test]
    fn test_begin_programs_registers() {
        let bus = block();
        let mut icb = icb(&bus);
        let ctl = IcbControl {
            bit_twist: true,
            cmd_data: true,
            ..control(cmd::WRITE_CHECKSUM)
        };
        icb.config_begin(&header(ctl, 32, Some(0xFEED_F00D))).unwrap();

        assert_eq!(bus.peek(REG_CFG_CMD), 0x101);
        assert_eq!(bus.peek(REG_CHKSUM_WORD), 0xFEED_F00D);
        assert_eq!(bus.peek(REG_CHAIN_LENGTH), 256);
        assert_eq!(
            bus.peek(REG_CFG_CTL),
            SOFT_RESET_N.mask() | CHKSUM_EN.mask() | CMD_DATA.mask() | CFG_KICKOFF.mask()
        );
        assert!(icb.soft_reset_done());
    }

    #[test]
    fn test_soft_reset_runs_once() {
        let bus = block();
        let mut icb = icb(&bus);
        let h = header(control(cmd::WRITE), 8, None);
        icb.config_begin(&h).unwrap();
        icb.config_begin(&h).unwrap();
        let asserted = bus
            .writes_to(REG_CFG_CTL)
            .iter()
            .filter(|&&v| v & SOFT_RESET_N.mask() == 0)
            .count();
        assert_eq!(asserted, 1);
    }

    #[test]
    fn test_postchecksum_read_skips_soft_reset() {
        let bus = block();
        bus.poke(REG_CFG_CTL, SOFT_RESET_N.mask());
        let mut icb = icb(&bus);
        icb.config_begin(&header(control(cmd::READ_POSTCHKSUM), 8, None)).unwrap();
        assert!(!icb.soft_reset_done());
        assert!(bus.writes_to(REG_CFG_CTL).iter().all(|&v| v & SOFT_RESET_N.mask() != 0));
    }

    #[test]
    fn test_stuck_reset_is_write_error() {
        let bus = block();
        bus.freeze(REG_CFG_CTL);
        let mut icb = icb(&bus);
        assert_eq!(
            icb.config_begin(&header(control(cmd::WRITE), 8, None)),
            Err(XcbError::WriteError)
        );
        assert!(!icb.soft_reset_done());
    }

    #[test]
    fn test_unreflected_command_is_conf_failed() {
        let bus = block();
        bus.freeze(REG_CFG_CMD);
        let mut icb = icb(&bus);
        assert_eq!(
            icb.config_begin(&header(control(cmd::WRITE_CHECKSUM), 8, None)),
            Err(XcbError::IcbConfFailed)
        );
        assert!(bus.writes_to(REG_CHAIN_LENGTH).is_empty());
    }

    #[test]
    fn test_chain_length_overflow_is_out_of_limit() {
        let bus = block();
        let mut icb = icb(&bus);
        assert_eq!(
            icb.config_begin(&header(control(cmd::WRITE), u32::MAX / 4, None)),
            Err(XcbError::OutOfLimit)
        );
    }

    #[test]
    fn test_read_mode_ignores_checksum() {
        let bus = block();
        let mut icb = icb(&bus);
        icb.config_begin(&header(control(cmd::READ), 8, Some(0x1234))).unwrap();
        assert!(bus.writes_to(REG_CHKSUM_WORD).is_empty());
        assert_eq!(bus.peek(REG_CFG_CTL) & CHKSUM_EN.mask(), 0);
    }

    // ── Test B: payload ──────────────────────────────────────────────────────

    #[test]
    fn test_chunks_are_bounded_by_payload() {
        let bus = block();
        let mut icb = icb(&bus);
        let h = header(control(cmd::WRITE), 16, None);
        let mut ctx = SessionContext::empty();
        icb.config_begin(&h).unwrap();

        icb.load(&h, &mut ctx, &mut [1u8; 8]).unwrap();
        icb.load(&h, &mut ctx, &mut [2u8; 8]).unwrap();
        assert_eq!(icb.loaded(), 16);
        assert_eq!(icb.load(&h, &mut ctx, &mut [3u8; 1]), Err(XcbError::InvalidDataLength));
        assert_eq!(icb.load(&h, &mut ctx, &mut []), Err(XcbError::InvalidDataLength));
        assert_eq!(bus.writes_to(REG_TX).len(), 4);
        assert_eq!(ctx.route().unwrap().dst, Endpoint::Register(REG_TX));
    }

    #[test]
    fn test_load_waits_for_shift_engine() {
        let bus = block();
        bus.script_reads(REG_SHIFT_STATUS, &[1, 1, 1, 0]);
        let mut icb = icb(&bus);
        let h = header(control(cmd::WRITE), 4, None);
        icb.load(&h, &mut SessionContext::empty(), &mut [0u8; 4]).unwrap();
        assert_eq!(bus.reads_of(REG_SHIFT_STATUS), 4);
    }

    #[test]
    fn test_read_mode_drains_rx() {
        let bus = block();
        bus.script_reads(REG_RX, &[0xDDCC_BBAA]);
        let mut icb = icb(&bus);
        let h = header(control(cmd::READ), 4, None);
        let mut ctx = SessionContext::empty();
        let mut chain = [0u8; 4];
        icb.load(&h, &mut ctx, &mut chain).unwrap();
        assert_eq!(chain, [0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(ctx.route().unwrap().src, Endpoint::Register(REG_RX));
    }

    #[test]
    fn test_transfer_failure() {
        let bus = block();
        let mut icb = Icb::new(bus.clone(), FailingTransfer, NoopDelay::new(), IcbConfig::default());
        let h = header(control(cmd::WRITE), 4, None);
        assert_eq!(
            icb.load(&h, &mut SessionContext::empty(), &mut [0u8; 4]),
            Err(XcbError::IcbTransferFailed)
        );
        assert_eq!(icb.loaded(), 0);
    }

    // ── Test C: config end ───────────────────────────────────────────────────

    #[test]
    fn test_end_requires_kickoff_self_clear() {
        let bus = SimBus::new(REGISTER_MAP);
        let mut icb = icb(&bus);
        let h = header(control(cmd::WRITE), 4, None);
        icb.config_begin(&h).unwrap();
        icb.load(&h, &mut SessionContext::empty(), &mut [0u8; 4]).unwrap();
        assert_eq!(icb.config_end(&h), Err(XcbError::IcbTransferFailed));
    }

    #[test]
    fn test_end_requires_done_outside_postchecksum_read() {
        let bus = SimBus::new(REGISTER_MAP);
        bus.on_transfer(REG_TX, REG_CFG_CTL, 0, CFG_KICKOFF.mask());
        bus.on_transfer(REG_RX, REG_CFG_CTL, 0, CFG_KICKOFF.mask());
        let mut icb = icb(&bus);

        let write = header(control(cmd::WRITE), 4, None);
        icb.config_begin(&write).unwrap();
        icb.load(&write, &mut SessionContext::empty(), &mut [0u8; 4]).unwrap();
        assert_eq!(icb.config_end(&write), Err(XcbError::UnexpectedValue));

        let post = header(control(cmd::READ_POSTCHKSUM), 4, None);
        icb.config_begin(&post).unwrap();
        icb.load(&post, &mut SessionContext::empty(), &mut [0u8; 4]).unwrap();
        icb.config_end(&post).unwrap();
    }

    #[test]
    fn test_end_checksum_mismatch() {
        let bus = block();
        let mut icb = icb(&bus);
        let h = header(control(cmd::WRITE_CHECKSUM), 4, Some(0xAB));
        icb.config_begin(&h).unwrap();
        icb.load(&h, &mut SessionContext::empty(), &mut [0u8; 4]).unwrap();
        assert_eq!(icb.config_end(&h), Err(XcbError::ChecksumMatchFailed));

        bus.poke(REG_STATUS, CHKSUM_OK.mask());
        icb.config_end(&h).unwrap();
    }

    #[test]
    fn test_capture_only_is_one_pulse() {
        let bus = block();
        let mut icb = timed(&bus);
        let ctl = IcbControl {
            capture: true,
            cmd_data: true,
            ..control(cmd::WRITE)
        };
        let h = header(ctl, 4, None);
        icb.config_begin(&h).unwrap();
        icb.load(&h, &mut SessionContext::empty(), &mut [0u8; 4]).unwrap();
        icb.config_end(&h).unwrap();

        assert_eq!(rises(&bus, CAPTURE), 1);
        assert_eq!(rises(&bus, UPDATE), 0);
        assert_eq!(bus.peek(REG_CFG_CTL) & (CAPTURE.mask() | CMD_DATA.mask()), 0);
        assert_eq!(bus.clock_ns(), u64::from(IcbConfig::default().pulse_delay_us) * 1_000);
    }

    #[test]
    fn test_capture_and_update_are_independent_pulses() {
        let bus = block();
        let mut icb = timed(&bus);
        let ctl = IcbControl {
            capture: true,
            update: true,
            cmd_data: true,
            ..control(cmd::WRITE)
        };
        let h = header(ctl, 4, None);
        icb.config_begin(&h).unwrap();
        icb.load(&h, &mut SessionContext::empty(), &mut [0u8; 4]).unwrap();
        icb.config_end(&h).unwrap();

        assert_eq!(rises(&bus, CAPTURE), 1);
        assert_eq!(rises(&bus, UPDATE), 1);
        for bit in [CAPTURE, UPDATE] {
            let fall = falls(&bus, bit);
            assert_eq!(fall.len(), 1);
            assert_eq!(fall[0] & CMD_DATA.mask(), 0, "cmd_data dropped with the pulse");
        }
        assert_eq!(bus.clock_ns(), 2 * u64::from(IcbConfig::default().pulse_delay_us) * 1_000);
    }

    #[test]
    fn test_no_pulse_without_flags() {
        let bus = block();
        let mut icb = timed(&bus);
        let h = header(control(cmd::WRITE), 4, None);
        icb.config_begin(&h).unwrap();
        icb.load(&h, &mut SessionContext::empty(), &mut [0u8; 4]).unwrap();
        icb.config_end(&h).unwrap();
        assert_eq!(rises(&bus, CAPTURE) + rises(&bus, UPDATE), 0);
        assert_eq!(bus.clock_ns(), 0);
    }

    #[test]
    fn test_reset_forces_soft_reset() {
        let bus = block();
        let mut icb = icb(&bus);
        icb.config_begin(&header(control(cmd::WRITE), 4, None)).unwrap();
        bus.clear_log();
        icb.reset().unwrap();
        assert_eq!(bus.writes_to(REG_CFG_CTL).first().map(|v| v & SOFT_RESET_N.mask()), Some(0));
    }

    #[test]
    fn test_info_direction_follows_command() {
        type Dev = Icb<SimBus, PioTransfer, NoopDelay>;
        let read = Dev::info(&header(control(cmd::READ), 64, None));
        assert_eq!(read.direction, TransferDirection::Readback);
        assert_eq!(read.total_size, 64);
        let write = Dev::info(&header(control(cmd::WRITE), 64, None));
        assert_eq!(write.direction, TransferDirection::Write);
    }
}
