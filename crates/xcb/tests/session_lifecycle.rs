//! End-to-end sessions through the driver API against the register-file
//! simulator.
//!
//! Run with: cargo test -p xcb --test session_lifecycle

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use embedded_hal_mock::eh1::delay::NoopDelay;
use platform::mocks::{BusOp, FailingTransfer, SimBus, SimDelay};
use platform::{
    ControllerKind, DriverError, FpgaManager, FpgaStatus, PioTransfer, SessionContext,
    TransferDirection,
};
use xcb::fcb::registers as fcb_reg;
use xcb::icb::registers as icb_reg;
use xcb::{
    ActionHeader, Fcb, FcbConfig, FcbControl, FcbDevice, FcbHeader, Icb, IcbConfig, IcbControl,
    IcbDevice, IcbHeader,
};

const WIDTH: u16 = 16;
const LINES: u32 = 4;

fn fcb_header(readback: bool, checksum: Option<u32>) -> FcbHeader {
    FcbHeader {
        generic: ActionHeader {
            action_enum: if checksum.is_some() {
                0x0042 | ActionHeader::CHECKSUM_PRESENT
            } else {
                0x0042
            },
            action_size: 16,
            payload_size: u32::from(WIDTH) * LINES,
        },
        checksum: checksum.unwrap_or(0),
        control: FcbControl {
            bitline_reg_width: WIDTH,
            readback,
        },
    }
}

fn fcb_device(bus: &SimBus) -> FcbDevice<SimBus, PioTransfer, SimDelay> {
    FcbDevice::new(Fcb::new(bus.clone(), PioTransfer, bus.delay(), FcbConfig::default()))
}

/// FCB block whose checksum engine reports a match once data arrives.
fn matching_fcb_block() -> SimBus {
    let bus = SimBus::new(fcb_reg::REGISTER_MAP);
    bus.on_transfer(fcb_reg::REG_BL_TX, fcb_reg::REG_STATUS, fcb_reg::CHKSUM_OK.mask(), 0);
    bus
}

/// ICB block whose shift engine finishes on the first FIFO access.
fn icb_block() -> SimBus {
    let bus = SimBus::new(icb_reg::REGISTER_MAP);
    for fifo in [icb_reg::REG_TX, icb_reg::REG_RX] {
        bus.on_transfer(
            fifo,
            icb_reg::REG_CFG_CTL,
            icb_reg::CFG_DONE.mask(),
            icb_reg::CFG_KICKOFF.mask(),
        );
    }
    bus
}

// ── Test A: FCB sessions ─────────────────────────────────────────────────────

#[test]
fn fcb_write_session_with_checksum() {
    let bus = matching_fcb_block();
    let mut dev = fcb_device(&bus);
    let raw = fcb_header(false, Some(0xDEAD_BEEF)).encode().unwrap();
    let mut ctx = SessionContext::new(&raw);

    dev.session_start(&mut ctx).unwrap();
    assert_eq!(dev.status(), FpgaStatus::Active);
    assert_eq!(ctx.device(), Some(ControllerKind::Fcb));
    let info = dev.info();
    assert_eq!(info.direction, TransferDirection::Write);
    assert_eq!((info.block_size, info.total_size), (16, 64));

    for line in 0..LINES {
        let mut bits = [line as u8; WIDTH as usize];
        dev.load(&mut ctx, &mut bits).unwrap();
    }
    assert_eq!(bus.writes_to(fcb_reg::REG_BL_TX).len(), (LINES * 4) as usize);
    // one counter clear at begin, one after every line
    assert_eq!(bus.writes_to(fcb_reg::REG_BL_CLR).len(), 1 + LINES as usize);

    dev.session_free(&mut ctx).unwrap();
    assert_eq!(dev.status(), FpgaStatus::Inactive);
    assert_eq!(ctx, SessionContext::empty());
    let ctl = bus.peek(fcb_reg::REG_CFG_CTL);
    assert_ne!(ctl & fcb_reg::CFG_DONE.mask(), 0);
    assert_eq!(ctl & fcb_reg::CHKSUM_PRECHECK_EN.mask(), 0);
    assert_eq!(bus.dropped(), 0);
}

#[test]
fn fcb_readback_session() {
    let bus = SimBus::new(fcb_reg::REGISTER_MAP);
    let mut dev = fcb_device(&bus);
    let raw = fcb_header(true, None).encode().unwrap();
    let mut ctx = SessionContext::new(&raw);

    dev.session_start(&mut ctx).unwrap();
    assert_eq!(dev.info().direction, TransferDirection::Readback);
    for line in 0..LINES {
        bus.script_reads(fcb_reg::REG_BL_RX, &[line; 4]);
        let mut bits = [0u8; WIDTH as usize];
        dev.load(&mut ctx, &mut bits).unwrap();
        assert_eq!(bits[0], line as u8);
    }
    assert_eq!(bus.peek(fcb_reg::REG_WL_RD_CNT), LINES);
    assert!(bus.writes_to(fcb_reg::REG_BL_TX).is_empty());
    dev.session_free(&mut ctx).unwrap();
}

#[test]
fn fcb_settle_delay_runs_for_every_strobe() {
    let bus = SimBus::new(fcb_reg::REGISTER_MAP);
    let mut dev = fcb_device(&bus);
    let raw = fcb_header(false, None).encode().unwrap();
    let mut ctx = SessionContext::new(&raw);
    dev.session_start(&mut ctx).unwrap();
    for _ in 0..LINES {
        dev.load(&mut ctx, &mut [0u8; WIDTH as usize]).unwrap();
    }
    let settle = u64::from(FcbConfig::default().settle_ns);
    assert_eq!(bus.clock_ns(), settle * u64::from(LINES));
    let delays = bus.ops().iter().filter(|op| matches!(op, BusOp::Delay { .. })).count();
    assert_eq!(delays, LINES as usize);
}

#[test]
fn fcb_short_line_leaves_bus_untouched() {
    let bus = SimBus::new(fcb_reg::REGISTER_MAP);
    let mut dev = fcb_device(&bus);
    let mut header = fcb_header(false, None);
    header.control.bitline_reg_width = 64;
    let raw = header.encode().unwrap();
    let mut ctx = SessionContext::new(&raw);
    dev.session_start(&mut ctx).unwrap();
    bus.clear_log();

    assert_eq!(dev.load(&mut ctx, &mut [0u8; 32]), Err(DriverError::Io));
    assert!(bus.ops().is_empty());
}

#[test]
fn fcb_wrong_write_count_is_reported() {
    let bus = SimBus::new(fcb_reg::REGISTER_MAP);
    let mut dev = fcb_device(&bus);
    let raw = fcb_header(false, None).encode().unwrap();
    let mut ctx = SessionContext::new(&raw);
    dev.session_start(&mut ctx).unwrap();

    bus.stick(fcb_reg::REG_BL_WR_CNT, u32::from(WIDTH) * 8 - 32);
    assert_eq!(dev.load(&mut ctx, &mut [0u8; WIDTH as usize]), Err(DriverError::Io));
}

#[test]
fn fcb_checksum_mismatch_still_tears_down() {
    let bus = SimBus::new(fcb_reg::REGISTER_MAP);
    let mut dev = fcb_device(&bus);
    let raw = fcb_header(false, Some(0x0BAD_F00D)).encode().unwrap();
    let mut ctx = SessionContext::new(&raw);
    dev.session_start(&mut ctx).unwrap();
    dev.load(&mut ctx, &mut [0u8; WIDTH as usize]).unwrap();

    assert_eq!(dev.session_free(&mut ctx), Err(DriverError::Canceled));
    assert_eq!(dev.status(), FpgaStatus::Inactive);
    assert_eq!(ctx.device(), None);
    assert!(!dev.session_open());
    assert_eq!(bus.peek(fcb_reg::REG_CFG_CTL) & fcb_reg::CHKSUM_PRECHECK_EN.mask(), 0);
}

#[test]
fn fcb_broken_latch_cancels_start() {
    let bus = SimBus::new(fcb_reg::REGISTER_MAP);
    bus.freeze(fcb_reg::REG_OP);
    let mut dev = fcb_device(&bus);
    let raw = fcb_header(false, None).encode().unwrap();
    let mut ctx = SessionContext::new(&raw);

    assert_eq!(dev.session_start(&mut ctx), Err(DriverError::Canceled));
    assert_eq!(dev.status(), FpgaStatus::Inactive);
    bus.clear_log();
    assert_eq!(dev.load(&mut ctx, &mut [0u8; WIDTH as usize]), Err(DriverError::NoDevice));
    assert!(bus.ops().is_empty());
    // teardown is still owed
    assert!(dev.session_open());
    assert_eq!(dev.session_free(&mut ctx), Ok(()));
    assert_eq!(dev.status(), FpgaStatus::Inactive);
}

#[test]
fn fcb_transfer_failure_is_io() {
    let bus = SimBus::new(fcb_reg::REGISTER_MAP);
    let mut dev = FcbDevice::new(Fcb::new(
        bus.clone(),
        FailingTransfer,
        NoopDelay::new(),
        FcbConfig::default(),
    ));
    let raw = fcb_header(false, None).encode().unwrap();
    let mut ctx = SessionContext::new(&raw);
    dev.session_start(&mut ctx).unwrap();
    assert_eq!(dev.load(&mut ctx, &mut [0u8; WIDTH as usize]), Err(DriverError::Io));
    assert_eq!(bus.peek(fcb_reg::REG_CFG_CTL) & fcb_reg::BL_GATING.mask(), 0);
}

#[test]
fn fcb_reset_idles_block() {
    let bus = SimBus::new(fcb_reg::REGISTER_MAP);
    bus.poke(fcb_reg::REG_OP, fcb_reg::WL_ALL);
    let mut dev = fcb_device(&bus);
    dev.reset().unwrap();
    assert_eq!(bus.peek(fcb_reg::REG_OP), 0);
}

// ── Test B: ICB sessions ─────────────────────────────────────────────────────

fn icb_header(control: IcbControl, payload_size: u32) -> IcbHeader {
    IcbHeader {
        generic: ActionHeader {
            action_enum: 0x0051,
            action_size: 12,
            payload_size,
        },
        checksum: 0,
        control,
    }
}

#[test]
fn icb_write_session_with_capture_and_update() {
    let bus = icb_block();
    let mut dev = IcbDevice::new(Icb::new(bus.clone(), PioTransfer, bus.delay(), IcbConfig::default()));
    let control = IcbControl {
        cfg_cmd: icb_reg::cmd::WRITE,
        capture: true,
        update: true,
        cmd_data: true,
        ..IcbControl::default()
    };
    let raw = icb_header(control, 24).encode().unwrap();
    let mut ctx = SessionContext::new(&raw);

    dev.session_start(&mut ctx).unwrap();
    assert_eq!(bus.peek(icb_reg::REG_CHAIN_LENGTH), 24 * 8);
    dev.load(&mut ctx, &mut [0xA5u8; 16]).unwrap();
    dev.load(&mut ctx, &mut [0x5Au8; 8]).unwrap();
    assert_eq!(dev.load(&mut ctx, &mut [0u8; 4]), Err(DriverError::Io));
    dev.session_free(&mut ctx).unwrap();

    let ctl = bus.peek(icb_reg::REG_CFG_CTL);
    assert_ne!(ctl & icb_reg::CFG_DONE.mask(), 0);
    let pulse_bits = icb_reg::CAPTURE.mask() | icb_reg::UPDATE.mask() | icb_reg::CMD_DATA.mask();
    assert_eq!(ctl & pulse_bits, 0);
    assert_eq!(bus.clock_ns(), 2 * u64::from(IcbConfig::default().pulse_delay_us) * 1_000);
    assert_eq!(dev.status(), FpgaStatus::Inactive);
}

#[test]
fn icb_failed_register_program_keeps_payload_out() {
    let bus = icb_block();
    bus.freeze(icb_reg::REG_CFG_CMD);
    let mut dev = IcbDevice::new(Icb::new(bus.clone(), PioTransfer, NoopDelay::new(), IcbConfig::default()));
    let control = IcbControl {
        cfg_cmd: icb_reg::cmd::WRITE_CHECKSUM,
        ..IcbControl::default()
    };
    let raw = icb_header(control, 8).encode().unwrap();
    let mut ctx = SessionContext::new(&raw);

    assert_eq!(dev.session_start(&mut ctx), Err(DriverError::Canceled));
    assert_eq!(dev.status(), FpgaStatus::Inactive);
    assert_eq!(dev.load(&mut ctx, &mut [0u8; 8]), Err(DriverError::NoDevice));
    assert!(bus.writes_to(icb_reg::REG_TX).is_empty());

    let _ = dev.session_free(&mut ctx);
    assert!(!dev.session_open());
    assert_eq!(dev.status(), FpgaStatus::Inactive);
}

#[test]
fn icb_stalled_kickoff_cancels_free() {
    let bus = SimBus::new(icb_reg::REGISTER_MAP);
    let mut dev = IcbDevice::new(Icb::new(bus.clone(), PioTransfer, NoopDelay::new(), IcbConfig::default()));
    let raw = icb_header(IcbControl::default(), 4).encode().unwrap();
    let mut ctx = SessionContext::new(&raw);
    dev.session_start(&mut ctx).unwrap();
    dev.load(&mut ctx, &mut [0u8; 4]).unwrap();
    assert_eq!(dev.session_free(&mut ctx), Err(DriverError::Canceled));
    assert_eq!(dev.status(), FpgaStatus::Inactive);
}

#[test]
fn context_of_another_controller_is_rejected() {
    let fcb_bus = SimBus::new(fcb_reg::REGISTER_MAP);
    let mut fcb = fcb_device(&fcb_bus);
    let fcb_raw = fcb_header(false, None).encode().unwrap();
    let mut fcb_ctx = SessionContext::new(&fcb_raw);
    fcb.session_start(&mut fcb_ctx).unwrap();

    let icb_bus = icb_block();
    let mut icb = IcbDevice::new(Icb::new(icb_bus.clone(), PioTransfer, NoopDelay::new(), IcbConfig::default()));
    let icb_raw = icb_header(IcbControl::default(), 16).encode().unwrap();
    let mut icb_ctx = SessionContext::new(&icb_raw);
    icb.session_start(&mut icb_ctx).unwrap();

    assert_eq!(icb.load(&mut fcb_ctx, &mut [0u8; 16]), Err(DriverError::NoDevice));
    assert!(icb_bus.writes_to(icb_reg::REG_TX).is_empty());
}

// ── Test C: boundary codes ───────────────────────────────────────────────────

#[test]
fn driver_errors_use_zephyr_errno_values() {
    assert_eq!(DriverError::Canceled.errno(), -140);
    assert_eq!(DriverError::Io.errno(), -5);
    assert_eq!(DriverError::NotSupported.errno(), -88);
    assert_eq!(DriverError::NoDevice.errno(), -19);
    assert_eq!(DriverError::Busy.errno(), -16);
}

#[test]
fn malformed_metadata_cancels_start() {
    let bus = SimBus::new(fcb_reg::REGISTER_MAP);
    let mut dev = fcb_device(&bus);
    let mut ctx = SessionContext::new(&[0x00, 0x10, 0x00]);
    assert_eq!(dev.session_start(&mut ctx), Err(DriverError::Canceled));
    assert!(!dev.session_open());
    assert!(bus.ops().is_empty());
}
