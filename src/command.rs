//! Command codes and up-front validation.
//!
//! Only IDENTIFY, POLL and RESET are implemented. READ and WRITE (controller pak
//! access) are known but rejected before the line is touched, so no half-formed
//! traffic ever reaches the controller.

use crate::consts::{MAX_COMMAND_LEN, MAX_REPLY_LEN};
use crate::error::Error;

/// A one-byte console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Ask for the device type and status. Replies with 3 bytes.
    Identify = 0x00,
    /// Read buttons and stick. Replies with 4 bytes.
    Poll = 0x01,
    /// Read 32 bytes from the controller pak. Not supported.
    Read = 0x02,
    /// Write 32 bytes to the controller pak. Not supported.
    Write = 0x03,
    /// Reset and identify. Replies with 3 bytes, the first being 5 on genuine pads.
    Reset = 0xFF,
}

impl Command {
    /// The wire code of this command.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Looks up a command by wire code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Identify),
            0x01 => Some(Self::Poll),
            0x02 => Some(Self::Read),
            0x03 => Some(Self::Write),
            0xFF => Some(Self::Reset),
            _ => None,
        }
    }

    /// Number of bytes the controller sends back for this command.
    ///
    /// READ answers with 32 data bytes plus a CRC byte, WRITE with a CRC byte only.
    pub const fn reply_len(self) -> usize {
        match self {
            Self::Identify | Self::Reset => 3,
            Self::Poll => 4,
            Self::Read => 33,
            Self::Write => 1,
        }
    }

    /// Whether the driver implements this command.
    pub const fn is_supported(self) -> bool {
        matches!(self, Self::Identify | Self::Poll | Self::Reset)
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(Error::UnsupportedCommand(code))
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.code()
    }
}

/// Checks a command and reply buffer before any bus activity.
///
/// # Arguments
/// - `command`: raw command bytes, the first one being the command code
/// - `reply_len`: length of the caller's reply buffer
///
/// # Returns
/// The parsed [`Command`], or the reason the transaction must not start. Checks run
/// in order: empty command, unknown or unsupported code, command longer than
/// [`MAX_COMMAND_LEN`], empty reply buffer, reply longer than [`MAX_REPLY_LEN`].
pub fn validate(command: &[u8], reply_len: usize) -> Result<Command, Error> {
    let code = *command.first().ok_or(Error::EmptyCommand)?;
    let parsed = Command::try_from(code)?;
    if !parsed.is_supported() {
        return Err(Error::UnsupportedCommand(code));
    }
    if command.len() > MAX_COMMAND_LEN {
        return Err(Error::CommandTooLong(command.len()));
    }
    if reply_len == 0 {
        return Err(Error::EmptyReply);
    }
    if reply_len > MAX_REPLY_LEN {
        return Err(Error::ReplyTooLong(reply_len));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_commands_validate() {
        assert_eq!(validate(&[0x00], 3), Ok(Command::Identify));
        assert_eq!(validate(&[0x01], 4), Ok(Command::Poll));
        assert_eq!(validate(&[0xFF], 3), Ok(Command::Reset));
    }

    #[test]
    fn test_read_write_rejected() {
        assert_eq!(validate(&[0x02, 0x80, 0x01], 4), Err(Error::UnsupportedCommand(0x02)));
        assert_eq!(validate(&[0x03], 1), Err(Error::UnsupportedCommand(0x03)));
    }

    #[test]
    fn test_unknown_codes_rejected() {
        for code in 0x04..=0xFEu8 {
            assert_eq!(validate(&[code], 4), Err(Error::UnsupportedCommand(code)));
        }
    }

    #[test]
    fn test_empty_and_oversized() {
        assert_eq!(validate(&[], 4), Err(Error::EmptyCommand));
        assert_eq!(validate(&[0x01], 9), Err(Error::ReplyTooLong(9)));
    }

    #[test]
    fn test_command_length_is_bounded() {
        assert_eq!(validate(&[0x01, 0x00, 0x00], 4), Ok(Command::Poll));
        assert_eq!(validate(&[0x01, 0x00, 0x00, 0x00], 4), Err(Error::CommandTooLong(4)));
        assert_eq!(validate(&[0x01; 20], 4), Err(Error::CommandTooLong(20)));
        // An unsupported code is reported first
        assert_eq!(validate(&[0x40; 8], 8), Err(Error::UnsupportedCommand(0x40)));
    }

    #[test]
    fn test_empty_reply_rejected() {
        assert_eq!(validate(&[0x01], 0), Err(Error::EmptyReply));
        assert_eq!(validate(&[0xFF], 1), Ok(Command::Reset));
    }

    #[test]
    fn test_reply_lengths() {
        assert_eq!(Command::Identify.reply_len(), 3);
        assert_eq!(Command::Poll.reply_len(), 4);
        assert_eq!(Command::Reset.reply_len(), 3);
        assert_eq!(u8::from(Command::Reset), 0xFF);
        assert_eq!(Command::from_code(0x01), Some(Command::Poll));
        assert_eq!(Command::from_code(0x40), None);
    }
}
