//! Errors returned by a bus transaction.

use thiserror::Error;

/// Why a transaction failed.
///
/// A failed transaction never leaves the bus or the driver in a bad state; the next
/// call starts from scratch. Retrying is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Error {
    /// The command slice was empty.
    #[error("command buffer is empty")]
    EmptyCommand,

    /// The command is longer than the 3 bytes the timeout budget allows for.
    #[error("command of {0} bytes exceeds the 3-byte limit")]
    CommandTooLong(usize),

    /// The command code is unknown or not implemented (READ/WRITE).
    ///
    /// Detected before any line activity; the reply buffer is left untouched.
    #[error("command {0} is not supported")]
    UnsupportedCommand(u8),

    /// The reply buffer is empty; every supported command gets an answer.
    #[error("reply buffer is empty")]
    EmptyReply,

    /// The reply buffer is longer than the 8 bytes the driver can capture.
    #[error("reply of {0} bytes exceeds the 8-byte limit")]
    ReplyTooLong(usize),

    /// The controller did not complete its reply in time.
    ///
    /// The first `received` bytes of the reply buffer hold what did arrive and the
    /// rest is zero. Treat the data as untrustworthy, not as absent.
    #[error("controller timed out after {received} of {expected} bytes")]
    Timeout {
        /// Complete bytes received before the deadline.
        received: usize,
        /// Bytes the caller asked for.
        expected: usize,
    },
}
