//! # n64pad
//!
//! A portable, no_std Rust driver for N64 and GameCube controllers, talking the
//! controller's single-wire, half-duplex bus with nothing but a GPIO pin.
//!
//! The bus idles high through a pull-up. Every bit is a 4 µs cell that starts with
//! a falling edge: a `0` holds the line low for 3 µs and releases it for 1 µs, a `1`
//! holds it low for 1 µs and releases it for 3 µs. The console ends a command with a
//! short stop pulse, the controller answers in the same encoding.
//!
//! This driver implements:
//! - a [`line::LineDriver`] that bit-bangs commands through `embedded-hal` delays
//! - a busy-wait [`polling::PollingDecoder`] running inside a `critical-section`
//! - an edge-interrupt [`isr::InterruptDecoder`] with a bounded timeout, driven by a
//!   shared [`isr::TransactionContext`]
//! - an [`pad::N64Pad`] wrapper that decodes buttons and stick axes
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `polling` (default)   | Busy-wait reply decoder |
//! | `interrupt` (default) | Edge-interrupt reply decoder, timeouts and ISR helpers |
//! | `std`                 | Enables `std` support in `thiserror`, `critical-section` and `log` |
//! | `defmt-0-3`           | Uses `defmt` logging and derives `defmt::Format` |
//! | `log`                 | Uses `log` logging |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use n64pad::{line::OpenDrainLine, pad::N64Pad, polling::PollingDecoder, profile::ATMEGA328P};
//!
//! let protocol = PollingDecoder::new(OpenDrainLine::new(data_pin), delay, &ATMEGA328P);
//! let mut pad = N64Pad::new(protocol, millis);
//! if pad.begin()? {
//!     loop {
//!         if let Ok(state) = pad.read() {
//!             // state.buttons, state.x, state.y
//!         }
//!     }
//! }
//! ```
//!
//! ## Integration Notes
//!
//! - Bit timing is only as accurate as the `DelayNs` provider. Calibrate
//!   [`line::BusTiming::toggle_overhead_ns`] for the target.
//! - Only one transaction can be in flight; the interrupt-driven decoder shares a
//!   single [`isr::TransactionContext`] with its edge handler.
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

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
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(all(test, not(feature = "std")))]
extern crate std;

// Must come first so the other modules see the logging macros
#[macro_use]
mod fmt;

pub use critical_section;
pub use heapless;

pub mod command;
pub mod consts;
pub mod error;
#[cfg(feature = "interrupt")]
pub mod isr;
pub mod line;
pub mod pad;
#[cfg(feature = "polling")]
pub mod polling;
pub mod profile;
#[cfg(test)]
mod sim;
pub mod transport;

pub use command::Command;
pub use error::Error;
pub use transport::Transport;
