//! Bulk payload transfer
//!
//! The configuration controllers only sequence the handshake around a
//! payload. Moving the payload itself (bitline words, ICB chain data, PCB
//! bitstream) is the job of a caller-supplied [`TransferHandler`], usually a
//! DMA channel or a secure-transfer engine. Drivers consume the result as
//! pass/fail only.
//!
//! [`PioTransfer`] is the programmed-I/O fallback: it pushes or pulls
//! 32-bit little-endian words through the controller's FIFO register.

use crate::register::RegisterBus;

/// One side of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endpoint {
    /// Caller-owned image buffer of `len` bytes
    Image {
        /// Buffer length in bytes
        len: usize,
    },
    /// Controller register (FIFO window) at this byte offset
    Register(usize),
}

/// Source and destination of the last transfer, recorded in the session
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferRoute {
    /// Where the bytes come from
    pub src: Endpoint,
    /// Where the bytes go
    pub dst: Endpoint,
}

/// A single bulk transfer between an image buffer and a FIFO register.
#[derive(Debug)]
pub enum TransferRequest<'a> {
    /// Push `src` into the register at `dst`.
    Write {
        /// Image bytes
        src: &'a [u8],
        /// FIFO register offset
        dst: usize,
    },
    /// Fill `dst` from the register at `src`.
    Read {
        /// FIFO register offset
        src: usize,
        /// Image bytes
        dst: &'a mut [u8],
    },
}

impl TransferRequest<'_> {
    /// Route of this request, as recorded in the session context.
    pub fn route(&self) -> TransferRoute {
        match self {
            Self::Write { src, dst } => TransferRoute {
                src: Endpoint::Image { len: src.len() },
                dst: Endpoint::Register(*dst),
            },
            Self::Read { src, dst } => TransferRoute {
                src: Endpoint::Register(*src),
                dst: Endpoint::Image { len: dst.len() },
            },
        }
    }

    /// Number of image bytes moved.
    pub fn len(&self) -> usize {
        match self {
            Self::Write { src, .. } => src.len(),
            Self::Read { dst, .. } => dst.len(),
        }
    }

    /// `true` when no bytes would move.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bulk transfer engine.
///
/// Implementations must finish the transfer before returning: the driver
/// clocks the controller as soon as `transfer` returns `Ok`.
pub trait TransferHandler<B: RegisterBus> {
    /// Error type
    type Error: core::fmt::Debug;

    /// Move the bytes described by `request`.
    fn transfer(&mut self, bus: &mut B, request: TransferRequest<'_>) -> Result<(), Self::Error>;
}

impl<B: RegisterBus, T: TransferHandler<B> + ?Sized> TransferHandler<B> for &mut T {
    type Error = T::Error;

    fn transfer(&mut self, bus: &mut B, request: TransferRequest<'_>) -> Result<(), Self::Error> {
        (**self).transfer(bus, request)
    }
}

/// Programmed-I/O transfer through a FIFO register.
///
/// Writes send `ceil(len / 4)` words; the final partial word is zero-padded.
/// Reads pull the same number of words and drop the padding bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PioTransfer;

impl<B: RegisterBus> TransferHandler<B> for PioTransfer {
    type Error = core::convert::Infallible;

    fn transfer(&mut self, bus: &mut B, request: TransferRequest<'_>) -> Result<(), Self::Error> {
        match request {
            TransferRequest::Write { src, dst } => {
                for chunk in src.chunks(4) {
                    let mut word = [0u8; 4];
                    for (slot, byte) in word.iter_mut().zip(chunk) {
                        *slot = *byte;
                    }
                    bus.write(dst, u32::from_le_bytes(word));
                }
            }
            TransferRequest::Read { src, dst } => {
                for chunk in dst.chunks_mut(4) {
                    let word = bus.read(src).to_le_bytes();
                    for (slot, byte) in chunk.iter_mut().zip(word.iter()) {
                        *slot = *byte;
                    }
                }
            }
        }
        Ok(())
    }
}
