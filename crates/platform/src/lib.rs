//! Hardware abstraction layer for the FPGA configuration controllers
//!
//! Everything the FCB/ICB/PCB drivers need from the target, expressed as
//! traits so the drivers build and test on the host.
//!
//! # Architecture Layers
//!
//! ```text
//! Driver API (FpgaManager, SessionContext, DriverError)
//!         ↓
//! Controller drivers (xcb crate)
//!         ↓
//! Platform HAL (this crate - register bus, transfer, delay)
//!         ↓
//! Hardware (volatile MMIO) or SimBus (host tests)
//! ```
//!
//! # Modules
//!
//! - [`register`] - register bus trait, bit-field primitives, register maps
//! - [`mmio`] - volatile register block
//! - [`transfer`] - bulk payload transfer handler
//! - [`delay`] - busy-wait delay
//! - [`fpga`] - driver API surface
//! - `mocks` - register-file simulator (`std` feature)
//!
//! # Features
//!
//! - `std`: Enable the simulator and `std::error::Error` impls
//! - `defmt`: Enable defmt::Format derives
//!
//! # Example
//!
//! ```
//! use platform::{read_reg_val, write_reg_val, Field, RegisterBus};
//!
//! fn set_width<B: RegisterBus>(bus: &mut B) {
//!     write_reg_val(bus, 0x04, Field::new(0, 16), 64).ok();
//!     assert_eq!(read_reg_val(bus, 0x04, Field::new(0, 16)), 64);
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // register accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod delay;
pub mod fpga;
pub mod mmio;
pub mod mocks;
pub mod register;
pub mod transfer;

pub use delay::SpinDelay;
pub use fpga::{
    ControllerKind, DriverError, FpgaManager, FpgaStatus, SessionContext, TransferDirection,
    TransferInfo,
};
pub use mmio::MmioRegisters;
pub use register::{
    read_reg_bit, read_reg_val, write_reg_val, Access, Field, RegisterBus, RegisterError,
    RegisterSpec,
};
pub use transfer::{Endpoint, PioTransfer, TransferHandler, TransferRequest, TransferRoute};
