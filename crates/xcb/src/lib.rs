//! Rigel FPGA configuration-block drivers
//!
//! Drivers for the three configuration controllers of the Rigel fabric:
//! the FCB (logic fabric, bitline by bitline), the ICB (interconnect scan
//! chain) and the PCB (peripheral block, board-sequenced).
//!
//! # Architecture
//!
//! ```text
//! Caller (loader service, xtask simulator)
//!         ↓  platform::FpgaManager
//! XcbDevice<C>          session state machine, error narrowing
//!         ↓  ConfigController
//! Fcb / Icb / Pcb       config begin, load, config end
//!         ↓  verify, FcbSequencer
//! platform::RegisterBus MMIO block or SimBus
//! ```
//!
//! Every control write is followed by a readback and the sequence stops at
//! the first mismatch. Nothing is retried.
//!
//! # Features
//!
//! - `std` - `std::error::Error` impls and the simulator (`platform::mocks`)
//! - `defmt` - firmware logging
//! - `tracing` - host logging (ignored when `defmt` is on)
//!
//! # Example
//!
//! ```
//! use platform::mocks::SimBus;
//! use platform::{FpgaManager, FpgaStatus, PioTransfer, SessionContext};
//! use xcb::fcb::{registers::REGISTER_MAP, Fcb, FcbDevice};
//! use xcb::header::{ActionHeader, FcbControl, FcbHeader};
//!
//! let bus = SimBus::new(REGISTER_MAP);
//! let mut fcb = FcbDevice::new(Fcb::new(bus.clone(), PioTransfer, bus.delay(), Default::default()));
//!
//! let raw = FcbHeader {
//!     generic: ActionHeader { action_enum: 0, action_size: 12, payload_size: 8 },
//!     checksum: 0,
//!     control: FcbControl { bitline_reg_width: 8, readback: false },
//! }
//! .encode()
//! .unwrap();
//!
//! let mut ctx = SessionContext::new(&raw);
//! fcb.session_start(&mut ctx).unwrap();
//! fcb.load(&mut ctx, &mut [0x5A; 8]).unwrap();
//! fcb.session_free(&mut ctx).unwrap();
//! assert_eq!(fcb.status(), FpgaStatus::Inactive);
//! ```

#![cfg_attr(not(test), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// Logging discipline
#![warn(clippy::print_stdout)] // log through defmt/tracing, not println!
#![warn(clippy::dbg_macro)]
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // error kinds are documented on XcbError
#![allow(clippy::cast_possible_truncation)] // control-word field extraction
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)] // register names in docs

#[cfg(all(feature = "std", not(test)))]
extern crate std;

#[macro_use]
mod fmt;

pub mod config;
pub mod error;
pub mod fcb;
pub mod header;
pub mod icb;
pub mod pcb;
pub mod session;
pub mod verify;

pub use config::{ConfigError, FcbConfig, IcbConfig, XcbConfig};
pub use error::{HwVerifyError, XcbError};
pub use fcb::{Fcb, FcbDevice, FcbSequencer};
pub use header::{
    ActionHeader, BitstreamHeader, ControlWord, FcbControl, FcbHeader, IcbControl, IcbHeader,
    PcbControl, PcbHeader,
};
pub use icb::{Icb, IcbDevice};
pub use pcb::{Pcb, PcbDevice, PcbSequencer};
pub use session::{ConfigController, XcbDevice};
