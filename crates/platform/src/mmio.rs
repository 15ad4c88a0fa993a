//! Memory-mapped register block
//!
//! [`MmioRegisters`] is the hardware [`RegisterBus`]: every call is a single
//! volatile 32-bit load or store at `base + offset`.

use crate::register::RegisterBus;

/// A 32-bit register block at a fixed physical address.
///
/// Accesses outside `len` bytes, or at unaligned offsets, are dropped
/// (writes) or read back as zero. Neither can happen with the constant
/// offsets the drivers use; the check keeps a bad offset from turning into
/// a wild store.
#[derive(Debug)]
pub struct MmioRegisters {
    base: *mut u32,
    len: usize,
}

impl MmioRegisters {
    /// Wrap the register block at `base` spanning `len` bytes.
    ///
    /// # Safety
    ///
    /// `base` must be the word-aligned address of a device register block of
    /// at least `len` bytes that stays mapped for the lifetime of the value,
    /// and no other code may access the block concurrently.
    #[must_use]
    pub const unsafe fn new(base: usize, len: usize) -> Self {
        Self {
            base: base as *mut u32,
            len,
        }
    }

    /// Base address of the block.
    pub fn base(&self) -> usize {
        self.base as usize
    }

    /// Block length in bytes.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// `true` for a zero-length block.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn slot(&self, offset: usize) -> Option<*mut u32> {
        if offset % 4 != 0 || offset.checked_add(4)? > self.len {
            return None;
        }
        // SAFETY: offset is word aligned and inside the block checked above,
        // so the resulting pointer stays within the mapping given to `new`.
        Some(unsafe { self.base.add(offset / 4) })
    }
}

impl RegisterBus for MmioRegisters {
    fn read(&mut self, offset: usize) -> u32 {
        match self.slot(offset) {
            // SAFETY: `slot` only yields aligned pointers inside the block.
            Some(ptr) => unsafe { ptr.read_volatile() },
            None => 0,
        }
    }

    fn write(&mut self, offset: usize, value: u32) {
        if let Some(ptr) = self.slot(offset) {
            // SAFETY: `slot` only yields aligned pointers inside the block.
            unsafe { ptr.write_volatile(value) };
        }
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_mmio_over_plain_memory() {
        let mut backing = [0u32; 4];
        // SAFETY: `backing` outlives `regs` and is 16 bytes of aligned memory.
        let mut regs = unsafe { MmioRegisters::new(backing.as_mut_ptr() as usize, 16) };
        regs.write(0x8, 0x1234_5678);
        assert_eq!(regs.read(0x8), 0x1234_5678);
        regs.write(0x10, 0xFFFF_FFFF); // out of range, dropped
        regs.write(0x2, 0xFFFF_FFFF); // unaligned, dropped
        assert_eq!(regs.read(0x10), 0);
        drop(regs);
        assert_eq!(backing, [0, 0, 0x1234_5678, 0]);
    }
}
