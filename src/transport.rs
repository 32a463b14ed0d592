//! The data-path entry point shared by both reply decoders.

use heapless::Vec;

use crate::command::Command;
use crate::consts::MAX_REPLY_LEN;
use crate::error::Error;

/// A way of exchanging one command and its reply with the controller.
///
/// Implemented by [`PollingDecoder`](crate::polling::PollingDecoder) and
/// [`InterruptDecoder`](crate::isr::InterruptDecoder).
pub trait Transport {
    /// Puts the line and interrupt sources into their idle state.
    ///
    /// Safe to call more than once.
    fn begin(&mut self);

    /// Sends `command` and fills `reply` with the controller's answer.
    ///
    /// `reply.len()` is the number of bytes expected. Unsupported commands fail
    /// before the line or `reply` are touched. Otherwise `reply` is zeroed first,
    /// and on [`Error::Timeout`] it holds the bytes that did arrive.
    fn run_command(&mut self, command: &[u8], reply: &mut [u8]) -> Result<(), Error>;

    /// Sends a one-byte `command` and returns a reply sized for it.
    fn query(&mut self, command: Command) -> Result<Vec<u8, MAX_REPLY_LEN>, Error> {
        let len = command.reply_len().min(MAX_REPLY_LEN);
        let mut reply: Vec<u8, MAX_REPLY_LEN> = Vec::new();
        reply
            .resize_default(len)
            .map_err(|_| Error::ReplyTooLong(len))?;
        self.run_command(&[command.code()], &mut reply)?;
        Ok(reply)
    }
}
