//! xtask inspect — decode a bitstream header file and print its fields.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use xcb::header::{BitstreamHeader, ControlWord, FcbHeader, IcbHeader, PcbHeader};
use xcb::icb::registers::cmd;

/// Configuration controller selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Variant {
    Fcb,
    Icb,
    Pcb,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fcb => "FCB",
            Self::Icb => "ICB",
            Self::Pcb => "PCB",
        })
    }
}

type Fields = Vec<(&'static str, String)>;

pub fn run(variant: Variant, file: &Path) -> Result<()> {
    let raw = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let fields = describe(variant, &raw)?;

    println!();
    println!("{}", format!("{variant} header: {}", file.display()).cyan().bold());
    for (name, value) in fields {
        println!("  {:<20} {}", name.dimmed(), value);
    }
    println!();
    Ok(())
}

/// Parse `raw` as a `variant` header.
pub(crate) fn parse<C: ControlWord>(variant: Variant, raw: &[u8]) -> Result<BitstreamHeader<C>> {
    BitstreamHeader::<C>::parse(raw).map_err(|e| anyhow!("invalid {variant} header: {e}"))
}

/// Field names and rendered values of the header in `raw`.
pub(crate) fn describe(variant: Variant, raw: &[u8]) -> Result<Fields> {
    match variant {
        Variant::Fcb => {
            let h: FcbHeader = parse(variant, raw)?;
            let width = h.control.bitline_reg_width;
            let mut fields = generic(&h, raw.len());
            fields.push(("bitline width", format!("{width} bytes")));
            fields.push(("readback", h.control.readback.to_string()));
            fields.push((
                "bitlines",
                h.generic
                    .payload_size
                    .checked_div(u32::from(width))
                    .map_or_else(|| "-".to_string(), |n| n.to_string()),
            ));
            Ok(fields)
        }
        Variant::Icb => {
            let h: IcbHeader = parse(variant, raw)?;
            let c = h.control;
            let mut fields = generic(&h, raw.len());
            fields.push(("cfg_cmd", format!("{} ({})", c.cfg_cmd, icb_command(c.cfg_cmd))));
            fields.push(("bit_twist", c.bit_twist.to_string()));
            fields.push(("byte_twist", c.byte_twist.to_string()));
            fields.push(("capture", c.capture.to_string()));
            fields.push(("update", c.update.to_string()));
            fields.push(("cmd_data", c.cmd_data.to_string()));
            Ok(fields)
        }
        Variant::Pcb => {
            let h: PcbHeader = parse(variant, raw)?;
            let mut fields = generic(&h, raw.len());
            fields.push(("cfg_cmd", h.control.cfg_cmd.to_string()));
            fields.push(("bitstream size", format!("{} bytes", h.control.bitstream_size)));
            Ok(fields)
        }
    }
}

fn generic<C: ControlWord>(h: &BitstreamHeader<C>, file_len: usize) -> Fields {
    let checksum = if h.has_checksum() {
        format!("{:#010x}", h.checksum)
    } else {
        "none".to_string()
    };
    vec![
        ("action_enum", format!("{:#06x}", h.generic.action_enum)),
        ("action_size", h.generic.action_size.to_string()),
        ("payload_size", format!("{} bytes", h.generic.payload_size)),
        ("checksum", checksum),
        ("header length", format!("{} bytes", h.encoded_len())),
        ("trailing bytes", file_len.saturating_sub(h.encoded_len()).to_string()),
    ]
}

fn icb_command(cfg_cmd: u8) -> &'static str {
    match cfg_cmd {
        cmd::WRITE => "write",
        cmd::WRITE_CHECKSUM => "write, checksum",
        cmd::READ_POSTCHKSUM => "read after checksum",
        cmd::READ => "read",
        _ => "vendor",
    }
}
