//! Constants used across the joybus protocol implementation.
//!
//! This module defines bus timing, reply sizing and caller-facing limits.
//! Timings are nominal: the bus is self-clocked, so the controller tolerates
//! some drift inside a cell but not across a whole byte.
//!
//! ## Key Concepts
//!
//! - **Bit cell**: 4 µs, split into a low phase and a released (high) phase.
//! - **Stop bit**: 1 µs low then release, ending a console command.
//! - **Timeout**: how long a transaction may take from the moment the timer starts
//!   (before the command is sent) until the last reply bit.

/// Duration of one bit cell, in microseconds.
pub const BIT_CELL_US: u32 = 4;

/// Duration of the console stop sequence, in microseconds.
pub const STOP_BIT_US: u32 = 3;

/// Nominal duration of the shortest phase inside a bit cell, in nanoseconds.
///
/// All line phases are multiples of this quantum: 1, 2 or 3 units.
pub const QUANTUM_NS: u32 = 1_000;

/// Maximum length of a command reply we support (GameCube poll).
pub const MAX_REPLY_LEN: usize = 8;

/// Longest command we expect to send before the reply starts, in bytes.
///
/// The timeout starts before the command goes out, so the budget must cover it too.
pub const MAX_COMMAND_LEN: usize = 3;

/// A read is considered failed if it hasn't completed within this many microseconds.
///
/// The longest reply is 8 bytes at 4 µs per bit and the timer is started before
/// up to 3 command bytes are sent: `(8 + 3) * 8 * 4 = 352 µs`. Function call and
/// interrupt entry overhead push that up, 500 leaves enough margin.
pub const COMMAND_TIMEOUT_US: u32 = 500;

/// Minimum interval between two polls issued by [`N64Pad`](crate::pad::N64Pad).
pub const POLL_INTERVAL_MS: u32 = 10;

/// First byte of the RESET reply from a genuine controller.
pub const GENUINE_RESET_MARKER: u8 = 5;

/// Device type reported by IDENTIFY for a standard N64 controller.
pub const N64_CONTROLLER_KIND: u16 = 0x0500;

const WORST_CASE_SHIFT_US: u32 = ((MAX_REPLY_LEN + MAX_COMMAND_LEN) * 8) as u32 * BIT_CELL_US;

const _: () = assert!(COMMAND_TIMEOUT_US > WORST_CASE_SHIFT_US);
