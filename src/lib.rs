//! # rf231-tdma
//!
//! A portable, no_std TDMA MAC for Atmel AT86RF231 2.4 GHz transceivers.
//!
//! One node acts as coordinator and broadcasts a beacon every cycle. Every other
//! node timestamps the beacon with a capture timer, derives its own send instant
//! from a fixed per-node slot offset, and answers inside its slot. The beacon
//! carries an output byte per client; the response reports the client's buttons.
//!
//! The driver is built from:
//! - `embedded-hal` traits for the SPI bus, control pins, IO board and delays
//! - a transceiver state controller that enforces the chip's legal transitions
//! - a capture ring buffer and beacon period estimator
//! - an interrupt-safe event queue shared through `critical-section`
//!
//! ## Crate features
//! | Feature     | Description |
//! |-------------|-------------|
//! | `std`       | Builds against `std` (host tests, simulation) |
//! | `defmt-0-3` | Uses `defmt` logging |
//! | `log`       | Uses `log` logging |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rf231_tdma::config::{NodeIdentity, RadioConfig, STM32F4_UID_ADDRESS};
//! use rf231_tdma::mac::{Role, TdmaMac};
//! use rf231_tdma::spi::SpiRadio;
//! use rf231_tdma::transceiver::Transceiver;
//!
//! rf231_tdma::init_tdma_shared!();
//!
//! let identity = unsafe { NodeIdentity::read_from(STM32F4_UID_ADDRESS as *const _) };
//! let trx = Transceiver::new(SpiRadio::new(spi, slp_tr, rst), delay);
//! let mut mac = TdmaMac::new(
//!     Role::Client,
//!     trx,
//!     timer,
//!     io_board,
//!     &TDMA_SHARED,
//!     identity,
//!     RadioConfig::default(),
//! );
//! mac.init()?;
//! mac.run();
//! ```
//!
//! The platform's interrupt handlers feed the loop through `TDMA_SHARED`:
//! [`isr::TdmaShared::capture`] on a beacon capture,
//! [`isr::TdmaShared::frame_received`] (or a bare [`mac::MacEvent::PacketReceived`])
//! on TRX_END while listening, and [`mac::MacEvent::FrameSent`] or
//! [`mac::MacEvent::TxModeTimerExpired`] from the timer and radio interrupts.
//!
//! ## Integration Notes
//!
//! - Timer ticks are assumed to be 1 µs; see [`consts`] for the cycle budget
//! - Only one MAC instance should share a `TdmaShared` at a time

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[macro_use]
mod fmt;

pub use critical_section;
pub use heapless;

pub mod config;
pub mod consts;
pub mod error;
pub mod frame;
pub mod hal;
pub mod ioboard;
pub mod isr;
pub mod mac;
pub mod period;
pub mod registers;
pub mod spi;
pub mod transceiver;

#[cfg(test)]
mod testing;
