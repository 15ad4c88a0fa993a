//! Register access primitives
//!
//! Every configuration controller is a block of 32-bit memory-mapped
//! registers. Drivers never touch the block directly: all accesses go
//! through a [`RegisterBus`], one register per call, in program order.
//!
//! On hardware the bus is [`crate::mmio::MmioRegisters`] (volatile
//! loads/stores). In host tests it is `mocks::SimBus`, a register-file
//! simulator driven by the same [`RegisterSpec`] maps the drivers publish.
//!
//! # Field helpers
//!
//! ```text
//!  31                offset+width   offset            0
//! ┌──────────────────────┬─────────────┬──────────────┐
//! │      untouched       │    field    │  untouched   │
//! └──────────────────────┴─────────────┴──────────────┘
//! ```
//!
//! [`write_reg_val`] is a read-modify-write of exactly one field. A value
//! wider than the field is rejected with [`RegisterError::ValueTooWide`],
//! never silently truncated.

/// 32-bit register block accessor.
///
/// Offsets are byte offsets from the block base and must be word aligned.
/// Implementations must perform exactly one bus access per call and must not
/// reorder, merge or elide accesses: the configuration controllers are
/// clocked through these writes.
pub trait RegisterBus {
    /// Read the register at `offset`.
    fn read(&mut self, offset: usize) -> u32;

    /// Write `value` to the register at `offset`.
    fn write(&mut self, offset: usize, value: u32);
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read(&mut self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        (**self).write(offset, value);
    }
}

// ─── Fields ──────────────────────────────────────────────────────────────────

/// A contiguous bit range inside a 32-bit register.
///
/// Construction is `const` and validated at compile time when used in a
/// `const` item, so drivers can declare their field tables up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    offset: u8,
    width: u8,
}

impl Field {
    /// The whole 32-bit register.
    pub const WORD: Self = Self::new(0, 32);

    /// Declare a field of `width` bits starting at bit `offset`.
    ///
    /// `width` must be in `1..=32` and `offset + width` must not exceed 32.
    #[must_use]
    pub const fn new(offset: u8, width: u8) -> Self {
        assert!(width >= 1 && width <= 32, "field width must be 1..=32");
        assert!(
            (offset as u32).saturating_add(width as u32) <= 32,
            "field exceeds register"
        );
        Self { offset, width }
    }

    /// Single-bit field at `bit`.
    #[must_use]
    pub const fn bit(bit: u8) -> Self {
        Self::new(bit, 1)
    }

    /// Bit offset of the field's least significant bit.
    pub const fn offset(self) -> u8 {
        self.offset
    }

    /// Field width in bits.
    pub const fn width(self) -> u8 {
        self.width
    }

    /// Unshifted mask covering `width` bits.
    pub const fn value_mask(self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            1u32.wrapping_shl(self.width as u32).wrapping_sub(1)
        }
    }

    /// Mask of the field in register position.
    pub const fn mask(self) -> u32 {
        self.value_mask().wrapping_shl(self.offset as u32)
    }

    /// Extract this field from a raw register value.
    pub const fn extract(self, raw: u32) -> u32 {
        raw.wrapping_shr(self.offset as u32) & self.value_mask()
    }

    /// Place `value` into `raw`, leaving every other bit untouched.
    pub fn insert(self, raw: u32, value: u32) -> Result<u32, RegisterError> {
        if value & !self.value_mask() != 0 {
            return Err(RegisterError::ValueTooWide {
                value,
                width: self.width,
            });
        }
        Ok((raw & !self.mask()) | value.wrapping_shl(u32::from(self.offset)))
    }
}

/// Field access failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterError {
    /// The value has bits set outside the field width.
    ValueTooWide {
        /// Rejected value
        value: u32,
        /// Field width in bits
        width: u8,
    },
}

impl core::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ValueTooWide { value, width } => {
                write!(f, "value {value:#x} does not fit a {width}-bit field")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RegisterError {}

// ─── Primitives ──────────────────────────────────────────────────────────────

/// Read a single bit of register `reg`.
pub fn read_reg_bit<B: RegisterBus + ?Sized>(bus: &mut B, reg: usize, bit: u8) -> bool {
    Field::bit(bit).extract(bus.read(reg)) != 0
}

/// Read `field` of register `reg`, right-aligned.
pub fn read_reg_val<B: RegisterBus + ?Sized>(bus: &mut B, reg: usize, field: Field) -> u32 {
    field.extract(bus.read(reg))
}

/// Read-modify-write `field` of register `reg`.
///
/// Performs one read and one write. Nothing is written when `value` does
/// not fit the field.
pub fn write_reg_val<B: RegisterBus + ?Sized>(
    bus: &mut B,
    reg: usize,
    field: Field,
    value: u32,
) -> Result<(), RegisterError> {
    if field == Field::WORD {
        bus.write(reg, value);
        return Ok(());
    }
    let raw = bus.read(reg);
    let updated = field.insert(raw, value)?;
    bus.write(reg, updated);
    Ok(())
}

// ─── Register maps ───────────────────────────────────────────────────────────

/// Hardware access semantics of one register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    /// Plain read/write storage.
    ReadWrite,
    /// Read-only status or mirror; writes are ignored by hardware.
    ReadOnly,
    /// Writing 1 to a bit sets the same bit in the `target` latch.
    WriteOneToSet {
        /// Latch offset
        target: usize,
    },
    /// Writing 1 to a bit clears the same bit in the `target` latch.
    WriteOneToClear {
        /// Latch offset
        target: usize,
    },
    /// Any write zeroes the `target` register (counter reset strobe).
    ClearOnWrite {
        /// Register cleared by the strobe
        target: usize,
    },
    /// Data FIFO window. Each word written adds 32 to `bit_counter` when set.
    Fifo {
        /// Offset of the shifted-bit counter, if the block has one
        bit_counter: Option<usize>,
    },
}

/// One entry of a controller register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSpec {
    /// Byte offset from the block base
    pub offset: usize,
    /// Datasheet name, used in diagnostics
    pub name: &'static str,
    /// Access semantics
    pub access: Access,
}

impl RegisterSpec {
    /// Declare a register.
    #[must_use]
    pub const fn new(offset: usize, name: &'static str, access: Access) -> Self {
        Self {
            offset,
            name,
            access,
        }
    }
}

/// Look up the datasheet name of `offset` in `map`.
pub fn register_name(map: &[RegisterSpec], offset: usize) -> &'static str {
    map.iter()
        .find(|spec| spec.offset == offset)
        .map_or("?", |spec| spec.name)
}

/// Size in bytes of the block described by `map` (highest offset + 4).
pub fn block_len(map: &[RegisterSpec]) -> usize {
    map.iter()
        .map(|spec| spec.offset.saturating_add(4))
        .max()
        .unwrap_or(0)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
