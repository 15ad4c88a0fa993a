//! Write-then-verify register operations
//!
//! Every control write in the configuration protocols is followed by a
//! readback of the same register (or of its read-only mirror), and the
//! sequence stops at the first mismatch. These helpers perform exactly that
//! pair of bus accesses and nothing else, so the observable bus sequence is
//! the same as the hand-written write/read/branch it replaces.
//!
//! Callers turn an [`HwVerifyError`] into the error kind that fits the step
//! with [`HwVerifyError::escalate`]. A value that does not fit its field is
//! reported as [`HwVerifyError::Rejected`] before any readback.

use platform::{read_reg_val, write_reg_val, Field, RegisterBus};

use crate::error::HwVerifyError;

/// Read `reg` and check that the bits under `mask` equal `expected`.
pub fn expect_bits<B: RegisterBus + ?Sized>(
    bus: &mut B,
    reg: usize,
    mask: u32,
    expected: u32,
) -> Result<(), HwVerifyError> {
    let observed = bus.read(reg);
    if observed & mask == expected & mask {
        Ok(())
    } else {
        Err(HwVerifyError::Mismatch {
            register: reg,
            mask,
            expected,
            observed,
        })
    }
}

/// Read-modify-write `field` of `reg`, then read it back.
///
/// A value wider than the field is never written (see
/// [`platform::write_reg_val`]) and is not read back.
pub fn verified_write<B: RegisterBus + ?Sized>(
    bus: &mut B,
    reg: usize,
    field: Field,
    value: u32,
) -> Result<(), HwVerifyError> {
    write_reg_val(bus, reg, field, value)
        .map_err(|cause| HwVerifyError::Rejected { register: reg, cause })?;
    let observed = read_reg_val(bus, reg, field);
    if observed == value {
        Ok(())
    } else {
        Err(HwVerifyError::Mismatch {
            register: reg,
            mask: field.mask(),
            expected: value,
            observed,
        })
    }
}

/// Set one bit of `reg` and verify it.
pub fn verified_set<B: RegisterBus + ?Sized>(
    bus: &mut B,
    reg: usize,
    bit: Field,
) -> Result<(), HwVerifyError> {
    verified_write(bus, reg, bit, 1)
}

/// Clear one bit of `reg` and verify it.
pub fn verified_clear<B: RegisterBus + ?Sized>(
    bus: &mut B,
    reg: usize,
    bit: Field,
) -> Result<(), HwVerifyError> {
    verified_write(bus, reg, bit, 0)
}

/// Write `mask` to a write-one-to-set port and verify the bits are high in
/// the latch mirror.
pub fn latch_set<B: RegisterBus + ?Sized>(
    bus: &mut B,
    set_port: usize,
    mirror: usize,
    mask: u32,
) -> Result<(), HwVerifyError> {
    bus.write(set_port, mask);
    expect_bits(bus, mirror, mask, mask)
}

/// Write `mask` to a write-one-to-clear port and verify the bits are low in
/// the latch mirror.
pub fn latch_clear<B: RegisterBus + ?Sized>(
    bus: &mut B,
    clear_port: usize,
    mirror: usize,
    mask: u32,
) -> Result<(), HwVerifyError> {
    bus.write(clear_port, mask);
    expect_bits(bus, mirror, mask, 0)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
