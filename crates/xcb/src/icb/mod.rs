//! Interconnect configuration block
//!
//! The ICB shifts a whole routing chain through one FIFO after a single
//! kickoff. Software programs the command, twists, checksum and chain
//! length, raises CFG_KICKOFF, streams the payload (in as many chunks as the
//! caller likes) and finally checks that kickoff self-cleared and CFG_DONE
//! rose. Optional capture and update pulses close the session.
//!
//! The block is soft-reset once, before its first session. A
//! post-checksum readback must not reset it: that would discard the
//! checksum state it reads.

pub mod registers;

mod controller;

pub use controller::Icb;

/// ICB behind the driver API.
pub type IcbDevice<B, T, D> = crate::session::XcbDevice<Icb<B, T, D>>;
