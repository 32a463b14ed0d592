//! Controller-level API on top of a [`Transport`].
//!
//! [`N64Pad`] resets the controller, reads its identity, and polls buttons and stick
//! axes no faster than once every [`POLL_INTERVAL_MS`].

use crate::command::Command;
use crate::consts::{GENUINE_RESET_MARKER, N64_CONTROLLER_KIND, POLL_INTERVAL_MS};
use crate::error::Error;
use crate::transport::Transport;

/// A free-running millisecond counter, allowed to wrap.
pub trait MillisClock {
    /// Current counter value.
    fn now_ms(&mut self) -> u32;
}

/// Button bitmap from a POLL reply, first byte in the high half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Buttons(pub u16);

#[allow(missing_docs)]
impl Buttons {
    pub const A: Self = Self(0x8000);
    pub const B: Self = Self(0x4000);
    pub const Z: Self = Self(0x2000);
    pub const START: Self = Self(0x1000);
    pub const D_UP: Self = Self(0x0800);
    pub const D_DOWN: Self = Self(0x0400);
    pub const D_LEFT: Self = Self(0x0200);
    pub const D_RIGHT: Self = Self(0x0100);
    pub const L: Self = Self(0x0020);
    pub const R: Self = Self(0x0010);
    pub const C_UP: Self = Self(0x0008);
    pub const C_DOWN: Self = Self(0x0004);
    pub const C_LEFT: Self = Self(0x0002);
    pub const C_RIGHT: Self = Self(0x0001);
}

impl Buttons {
    /// Whether every button in `other` is pressed.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether nothing is pressed.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// One decoded POLL reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct PadState {
    /// Pressed buttons.
    pub buttons: Buttons,
    /// Stick X axis, right is positive.
    pub x: i8,
    /// Stick Y axis, up is positive.
    pub y: i8,
}

impl PadState {
    /// Decodes a 4-byte POLL reply.
    pub fn from_poll_reply(reply: &[u8]) -> Option<Self> {
        match *reply {
            [hi, lo, x, y] => Some(Self {
                buttons: Buttons(u16::from_be_bytes([hi, lo])),
                x: i8::from_ne_bytes([x]),
                y: i8::from_ne_bytes([y]),
            }),
            _ => None,
        }
    }
}

/// Decoded IDENTIFY (or RESET) reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct DeviceInfo {
    /// Device type, `0x0500` for a standard controller.
    pub kind: u16,
    /// Status byte; bit 0 set when something is in the accessory slot.
    pub status: u8,
}

impl DeviceInfo {
    /// Decodes a 3-byte IDENTIFY reply.
    pub fn from_identify_reply(reply: &[u8]) -> Option<Self> {
        match *reply {
            [hi, lo, status] => Some(Self {
                kind: u16::from_be_bytes([hi, lo]),
                status,
            }),
            _ => None,
        }
    }

    /// Whether the device reports itself as a standard controller.
    pub fn is_controller(&self) -> bool {
        self.kind == N64_CONTROLLER_KIND
    }

    /// Whether a controller pak or other accessory is inserted.
    pub fn has_accessory(&self) -> bool {
        self.status & 0x01 != 0
    }
}

/// An N64 controller on a [`Transport`].
///
/// # Type Parameters
/// - `P`: the reply decoder
/// - `C`: the clock pacing [`read`](Self::read)
#[derive(Debug)]
pub struct N64Pad<P, C> {
    protocol: P,
    clock: C,
    last_poll: Option<u32>,
    state: PadState,
}

impl<P, C> N64Pad<P, C>
where
    P: Transport,
    C: MillisClock,
{
    /// Wraps a transport. Call [`begin`](Self::begin) before polling.
    pub fn new(protocol: P, clock: C) -> Self {
        Self {
            protocol,
            clock,
            last_poll: None,
            state: PadState::default(),
        }
    }

    /// Prepares the bus and resets the controller.
    ///
    /// # Returns
    /// Whether the controller answered like a genuine one (first reply byte 5).
    /// Third-party controllers often answer with something else and still work.
    pub fn begin(&mut self) -> Result<bool, Error> {
        self.protocol.begin();
        let reply = self.protocol.query(Command::Reset)?;
        let genuine = reply.first() == Some(&GENUINE_RESET_MARKER);
        debug!("controller reset, genuine: {}", genuine);
        Ok(genuine)
    }

    /// Asks the controller what it is.
    pub fn identify(&mut self) -> Result<DeviceInfo, Error> {
        let reply = self.protocol.query(Command::Identify)?;
        DeviceInfo::from_identify_reply(&reply).ok_or(Error::Timeout {
            received: reply.len(),
            expected: Command::Identify.reply_len(),
        })
    }

    /// Polls the controller.
    ///
    /// # Returns
    /// - `Err(nb::Error::WouldBlock)` if the previous poll was less than
    ///   [`POLL_INTERVAL_MS`] ago
    /// - the fresh state otherwise
    ///
    /// A failed poll still counts towards the interval.
    pub fn read(&mut self) -> nb::Result<PadState, Error> {
        let now = self.clock.now_ms();
        if let Some(last) = self.last_poll {
            if now.wrapping_sub(last) < POLL_INTERVAL_MS {
                return Err(nb::Error::WouldBlock);
            }
        }
        self.last_poll = Some(now);

        let reply = self.protocol.query(Command::Poll)?;
        let state = PadState::from_poll_reply(&reply).ok_or(Error::Timeout {
            received: reply.len(),
            expected: Command::Poll.reply_len(),
        })?;
        self.state = state;
        Ok(state)
    }

    /// The last successfully polled state.
    pub fn state(&self) -> PadState {
        self.state
    }

    /// Returns the transport and clock.
    pub fn free(self) -> (P, C) {
        (self.protocol, self.clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use std::vec::Vec;

    /// Answers each command code with a canned reply, or times out.
    struct ScriptedTransport {
        replies: Vec<(u8, Vec<u8>)>,
        sent: Vec<u8>,
        begun: usize,
    }

    impl ScriptedTransport {
        fn new(replies: &[(u8, &[u8])]) -> Self {
            Self {
                replies: replies.iter().map(|&(c, r)| (c, r.to_vec())).collect(),
                sent: Vec::new(),
                begun: 0,
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn begin(&mut self) {
            self.begun += 1;
        }

        fn run_command(&mut self, command: &[u8], reply: &mut [u8]) -> Result<(), Error> {
            self.sent.push(command[0]);
            reply.fill(0);
            match self.replies.iter().find(|(code, _)| *code == command[0]) {
                Some((_, bytes)) => {
                    reply.copy_from_slice(bytes);
                    Ok(())
                }
                None => Err(Error::Timeout {
                    received: 0,
                    expected: reply.len(),
                }),
            }
        }
    }

    struct Millis<'a>(&'a Cell<u32>);

    impl MillisClock for Millis<'_> {
        fn now_ms(&mut self) -> u32 {
            self.0.get()
        }
    }

    #[test]
    fn test_poll_reply_decoding() {
        let state = PadState::from_poll_reply(&[0x01, 0x23, 0x0A, 0xF6]).unwrap();
        assert_eq!(state.buttons, Buttons(0x0123));
        assert_eq!(state.x, 10);
        assert_eq!(state.y, -10);
        assert!(state.buttons.contains(Buttons::D_RIGHT));
        assert!(state.buttons.contains(Buttons::L));
        assert!(state.buttons.contains(Buttons::C_LEFT));
        assert!(state.buttons.contains(Buttons::C_RIGHT));
        assert!(!state.buttons.contains(Buttons::R));
        assert!(!state.buttons.contains(Buttons::A));
        assert!(state.buttons.contains(Buttons(Buttons::L.0 | Buttons::D_RIGHT.0)));
        assert!(PadState::from_poll_reply(&[0x01, 0x23, 0x0A]).is_none());
    }

    #[test]
    fn test_begin_reports_genuine_controller() {
        let now = Cell::new(0);
        let mut pad = N64Pad::new(
            ScriptedTransport::new(&[(0xFF, &[0x05, 0x00, 0x02])]),
            Millis(&now),
        );
        assert_eq!(pad.begin(), Ok(true));

        let mut clone = N64Pad::new(
            ScriptedTransport::new(&[(0xFF, &[0x00, 0x00, 0x00])]),
            Millis(&now),
        );
        assert_eq!(clone.begin(), Ok(false));

        let (protocol, _) = pad.free();
        assert_eq!(protocol.begun, 1);
        assert_eq!(protocol.sent, [0xFF]);
    }

    #[test]
    fn test_begin_propagates_timeout() {
        let now = Cell::new(0);
        let mut pad = N64Pad::new(ScriptedTransport::new(&[]), Millis(&now));
        assert_eq!(
            pad.begin(),
            Err(Error::Timeout {
                received: 0,
                expected: 3
            })
        );
    }

    #[test]
    fn test_identify() {
        let now = Cell::new(0);
        let mut pad = N64Pad::new(
            ScriptedTransport::new(&[(0x00, &[0x05, 0x00, 0x01])]),
            Millis(&now),
        );
        let info = pad.identify().unwrap();
        assert!(info.is_controller());
        assert!(info.has_accessory());
    }

    #[test]
    fn test_read_is_rate_limited() {
        let now = Cell::new(1_000);
        let mut pad = N64Pad::new(
            ScriptedTransport::new(&[(0x01, &[0x80, 0x00, 0x00, 0x7F])]),
            Millis(&now),
        );

        let state = pad.read().unwrap();
        assert!(state.buttons.contains(Buttons::A));
        assert_eq!(state.y, 127);

        now.set(1_009);
        assert_eq!(pad.read(), Err(nb::Error::WouldBlock));
        now.set(1_010);
        assert_eq!(pad.read(), Ok(state));
        assert_eq!(pad.state(), state);

        let (protocol, _) = pad.free();
        assert_eq!(protocol.sent, [0x01, 0x01]);
    }

    #[test]
    fn test_failed_poll_counts_towards_interval() {
        let now = Cell::new(u32::MAX - 4);
        let mut pad = N64Pad::new(ScriptedTransport::new(&[]), Millis(&now));
        assert_eq!(
            pad.read(),
            Err(nb::Error::Other(Error::Timeout {
                received: 0,
                expected: 4
            }))
        );
        assert_eq!(pad.state(), PadState::default());

        // Still within the interval across the wrap
        now.set(4);
        assert_eq!(pad.read(), Err(nb::Error::WouldBlock));
        now.set(5);
        assert!(matches!(pad.read(), Err(nb::Error::Other(_))));
    }
}
