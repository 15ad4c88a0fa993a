//! xtask trace — run one configuration session against the register-file
//! simulator and print every bus operation the driver issued.
//!
//! The simulated block behaves like healthy hardware: the FCB checksum
//! engine reports a match once bitline data arrives, the ICB shift engine
//! raises CFG_DONE and drops CFG_KICKOFF on the first FIFO access.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use platform::mocks::{BusOp, SimBus};
use platform::{DriverError, FpgaManager, PioTransfer, SessionContext};
use xcb::fcb::registers as fcb_reg;
use xcb::header::{FcbHeader, IcbHeader};
use xcb::icb::registers as icb_reg;
use xcb::{Fcb, FcbConfig, FcbDevice, Icb, IcbConfig, IcbDevice};

use crate::inspect::{parse, Variant};

/// Outcome of one simulated session.
pub(crate) struct Trace {
    pub bus: SimBus,
    pub loads: usize,
    pub result: Result<(), DriverError>,
}

pub fn run(variant: Variant, header: &Path, image: Option<&Path>) -> Result<()> {
    let raw = fs::read(header).with_context(|| format!("Failed to read {}", header.display()))?;
    let image = image
        .map(|p| fs::read(p).with_context(|| format!("Failed to read {}", p.display())))
        .transpose()?;

    let trace = simulate(variant, &raw, image)?;

    println!();
    println!("{}", format!("{variant} session trace").cyan().bold());
    for (n, op) in trace.bus.ops().iter().enumerate() {
        println!("  {}", render(&trace.bus, n, op));
    }
    if trace.bus.dropped() > 0 {
        println!("  {}", format!("... {} more operations not logged", trace.bus.dropped()).dimmed());
    }
    println!();
    println!("  loads          {}", trace.loads);
    println!("  settle/pulse   {} ns", trace.bus.clock_ns());

    match trace.result {
        Ok(()) => {
            println!("{}", "✓ Session completed".green().bold());
            println!();
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", format!("✗ Session failed: {err} ({})", err.errno()).red().bold());
            bail!("{variant} session failed")
        }
    }
}

/// Run a complete session of `variant` over a fresh simulated block.
///
/// `image` defaults to a zero-filled payload of the header's size.
pub(crate) fn simulate(variant: Variant, raw: &[u8], image: Option<Vec<u8>>) -> Result<Trace> {
    match variant {
        Variant::Fcb => {
            let header: FcbHeader = parse(variant, raw)?;
            let width = usize::from(header.control.bitline_reg_width);
            if width == 0 {
                bail!("FCB header declares a zero-width bitline register");
            }
            let mut image = payload(image, header.generic.payload_size)?;

            let bus = SimBus::new(fcb_reg::REGISTER_MAP);
            bus.on_transfer(fcb_reg::REG_BL_TX, fcb_reg::REG_STATUS, fcb_reg::CHKSUM_OK.mask(), 0);
            let mut dev = FcbDevice::new(Fcb::new(
                bus.clone(),
                PioTransfer,
                bus.delay(),
                FcbConfig::default(),
            ));
            let (loads, result) = session(&mut dev, raw, &mut image, width);
            Ok(Trace { bus, loads, result })
        }
        Variant::Icb => {
            let header: IcbHeader = parse(variant, raw)?;
            let mut image = payload(image, header.generic.payload_size)?;

            let bus = SimBus::new(icb_reg::REGISTER_MAP);
            for fifo in [icb_reg::REG_TX, icb_reg::REG_RX] {
                bus.on_transfer(
                    fifo,
                    icb_reg::REG_CFG_CTL,
                    icb_reg::CFG_DONE.mask(),
                    icb_reg::CFG_KICKOFF.mask(),
                );
            }
            let mut dev = IcbDevice::new(Icb::new(
                bus.clone(),
                PioTransfer,
                bus.delay(),
                IcbConfig::default(),
            ));
            let block = image.len().max(1);
            let (loads, result) = session(&mut dev, raw, &mut image, block);
            Ok(Trace { bus, loads, result })
        }
        Variant::Pcb => bail!("PCB sessions are sequenced by board code and cannot be simulated"),
    }
}

fn payload(image: Option<Vec<u8>>, payload_size: u32) -> Result<Vec<u8>> {
    match image {
        Some(image) => Ok(image),
        None => {
            let len = usize::try_from(payload_size).context("payload size does not fit in memory")?;
            Ok(vec![0; len])
        }
    }
}

/// start, load every `block`-sized chunk, free. `session_free` runs even
/// when an earlier step failed; the first failure wins.
fn session<M: FpgaManager>(
    dev: &mut M,
    raw: &[u8],
    image: &mut [u8],
    block: usize,
) -> (usize, Result<(), DriverError>) {
    let mut ctx = SessionContext::new(raw);
    let mut loads = 0usize;

    let loaded = dev.session_start(&mut ctx).and_then(|()| {
        for chunk in image.chunks_mut(block) {
            dev.load(&mut ctx, chunk)?;
            loads = loads.saturating_add(1);
        }
        Ok(())
    });
    let freed = dev.session_free(&mut ctx);
    tracing::debug!(loads, "session finished");

    (loads, loaded.and(freed))
}

fn render(bus: &SimBus, n: usize, op: &BusOp) -> String {
    match *op {
        BusOp::Read { offset, value } => {
            format!("{n:5}  R  {:<14} {value:#010x}", bus.name_of(offset))
        }
        BusOp::Write { offset, value } => {
            format!("{n:5}  {}  {:<14} {value:#010x}", "W".yellow(), bus.name_of(offset))
        }
        BusOp::Delay { ns } => format!("{n:5}  {}  {:<14} {ns} ns", "D".blue(), "delay"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use xcb::header::{ActionHeader, FcbControl, IcbControl};

    fn fcb_raw(width: u16, lines: u32, readback: bool) -> Vec<u8> {
        FcbHeader {
            generic: ActionHeader {
                action_enum: ActionHeader::CHECKSUM_PRESENT,
                action_size: 16,
                payload_size: u32::from(width).saturating_mul(lines),
            },
            checksum: 0x1234_5678,
            control: FcbControl {
                bitline_reg_width: width,
                readback,
            },
        }
        .encode()
        .unwrap()
        .to_vec()
    }

    #[test]
    fn fcb_write_session_completes() {
        let trace = simulate(Variant::Fcb, &fcb_raw(8, 3, false), None).unwrap();
        assert_eq!(trace.result, Ok(()));
        assert_eq!(trace.loads, 3);
        assert_eq!(trace.bus.writes_to(fcb_reg::REG_BL_TX).len(), 6);
        assert_eq!(trace.bus.clock_ns(), 3 * u64::from(FcbConfig::default().settle_ns));
    }

    #[test]
    fn fcb_ragged_image_fails_on_last_line() {
        let trace = simulate(Variant::Fcb, &fcb_raw(8, 2, false), Some(vec![0; 12])).unwrap();
        assert_eq!(trace.loads, 1);
        assert_eq!(trace.result, Err(DriverError::Io));
    }

    #[test]
    fn icb_session_completes() {
        let raw = IcbHeader {
            generic: ActionHeader {
                action_enum: 0,
                action_size: 12,
                payload_size: 32,
            },
            checksum: 0,
            control: IcbControl {
                capture: true,
                ..IcbControl::default()
            },
        }
        .encode()
        .unwrap();
        let trace = simulate(Variant::Icb, &raw, None).unwrap();
        assert_eq!(trace.result, Ok(()));
        assert_eq!(trace.loads, 1);
        assert_eq!(trace.bus.writes_to(icb_reg::REG_TX).len(), 8);
    }

    #[test]
    fn pcb_is_rejected() {
        let raw = fcb_raw(8, 1, false);
        assert!(simulate(Variant::Pcb, &raw, None).is_err());
    }

    #[test]
    fn zero_width_is_rejected() {
        assert!(simulate(Variant::Fcb, &fcb_raw(0, 1, false), None).is_err());
    }

    #[test]
    fn render_names_registers() {
        let bus = SimBus::new(fcb_reg::REGISTER_MAP);
        let line = render(&bus, 0, &BusOp::Read { offset: fcb_reg::REG_OP, value: 4 });
        assert!(line.contains("OP_REG"));
        assert!(line.contains("0x00000004"));
    }
}
