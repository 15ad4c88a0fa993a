//! Fabric configuration block
//!
//! The FCB loads the logic fabric one bitline at a time. Each `load` call
//! moves exactly one line (`bitline_reg_width` bytes) through the bitline
//! register, then clocks the wordline so the next line lands one position
//! further. The wordline itself is driven through a set/clear latch whose
//! every step is verified against a read-only mirror; see [`sequencer`].
//!
//! ```text
//! image ──► BL_TX ──► bitline register ──(strobe E/O)──► fabric row
//!                                          ▲
//!                          wordline latch ─┘ (MCLK/SCLK/BOTTOM)
//! ```

pub mod registers;
pub mod sequencer;

mod controller;

pub use controller::Fcb;
pub use sequencer::FcbSequencer;

/// FCB behind the driver API.
pub type FcbDevice<B, T, D> = crate::session::XcbDevice<Fcb<B, T, D>>;
