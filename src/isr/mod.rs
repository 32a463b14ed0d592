//! Edge-interrupt reply decoder.
//!
//! Only the command is sent inside a critical section. The reply is shifted in by
//! the falling-edge interrupt handler, which calls
//! [`TransactionContext::on_falling_edge`] once per bit, while the caller spins on
//! [`TransactionContext::received`] until the expected byte count arrives or the
//! [`TimeoutSource`] expires.
//!
//! Wiring a decoder takes four pieces, all supplied by the application:
//! - an [`EdgeInterrupt`] that (un)masks the falling-edge interrupt on the data pin
//! - a [`TimeoutSource`]: [`ClockTimeout`] on a free-running microsecond counter,
//!   or [`CountdownTimeout`] on a one-shot hardware timer
//! - optionally [`BackgroundInterrupts`] to pause for the length of a transaction
//! - a `static` [`TransactionContext`], declared with
//!   [`transaction_context!`](crate::transaction_context)
//!
//! ```rust,ignore
//! n64pad::transaction_context!(PAD_CTX);
//!
//! let timeout = ClockTimeout::for_profile(micros, &ATMEGA328P);
//! let mut protocol = InterruptDecoder::for_profile(
//!     OpenDrainLine::new(pin), delay, Int0, timeout, (), &PAD_CTX, &ATMEGA328P,
//! );
//! protocol.begin();
//! ```

use embedded_hal::delay::DelayNs;

use crate::command::validate;
use crate::error::Error;
use crate::line::{DataLine, LineDriver};
use crate::profile::TargetProfile;
use crate::transport::Transport;

mod context;
pub use context::*;

mod macros;

mod suspend;
pub use suspend::*;

mod timeout;
pub use timeout::*;

/// The falling-edge interrupt on the data pin.
pub trait EdgeInterrupt {
    /// Configures the pin to interrupt on falling edges, leaving the interrupt masked.
    fn prepare(&mut self);

    /// Clears any pending edge and unmasks the interrupt.
    ///
    /// Called inside a critical section right after the command's stop bit, so the
    /// first reply edge is latched even if it arrives before interrupts are back on.
    fn enable(&mut self);

    /// Masks the interrupt.
    fn disable(&mut self);
}

/// A [`Transport`] that receives the reply from an edge interrupt handler.
///
/// # Type Parameters
/// - `L`, `D`: the line and delay of the [`LineDriver`]
/// - `E`: the data pin's [`EdgeInterrupt`]
/// - `T`: the [`TimeoutSource`] bounding each transaction
/// - `B`: [`BackgroundInterrupts`] paused while a transaction is in flight
#[derive(Debug)]
pub struct InterruptDecoder<'a, L, D, E, T, B = ()> {
    driver: LineDriver<L, D>,
    edge: E,
    timeout: T,
    background: B,
    context: &'a TransactionContext,
}

impl<'a, L, D, E, T> InterruptDecoder<'a, L, D, E, T>
where
    L: DataLine,
    D: DelayNs,
    E: EdgeInterrupt,
    T: TimeoutSource,
{
    /// Creates a decoder that pauses nothing during transactions.
    ///
    /// # Arguments
    /// - `driver`: the line driver sending commands
    /// - `edge`: the data pin's edge interrupt
    /// - `timeout`: the deadline for a complete reply
    /// - `context`: the state shared with the edge interrupt handler
    pub fn new(
        driver: LineDriver<L, D>,
        edge: E,
        timeout: T,
        context: &'a TransactionContext,
    ) -> Self {
        Self {
            driver,
            edge,
            timeout,
            background: (),
            context,
        }
    }
}

impl<'a, L, D, E, T, B> InterruptDecoder<'a, L, D, E, T, Option<B>>
where
    L: DataLine,
    D: DelayNs,
    E: EdgeInterrupt,
    T: TimeoutSource,
    B: BackgroundInterrupts,
{
    /// Creates a decoder set up for `profile`.
    ///
    /// Commands use the profile's line timing, and `background` is only paused when
    /// the profile asks for it. Build `timeout` from the same profile with
    /// [`CountdownTimeout::for_profile`] or [`ClockTimeout::for_profile`].
    ///
    /// # Arguments
    /// - `line`, `delay`: the bus line and delay provider
    /// - `edge`: the data pin's edge interrupt
    /// - `timeout`: the deadline for a complete reply
    /// - `background`: interrupt sources the profile may need paused
    /// - `context`: the state shared with the edge interrupt handler
    /// - `profile`: the target
    pub fn for_profile(
        line: L,
        delay: D,
        edge: E,
        timeout: T,
        background: B,
        context: &'a TransactionContext,
        profile: &TargetProfile,
    ) -> Self {
        debug!("interrupt decoder for {}", profile.name);
        InterruptDecoder::new(
            LineDriver::new(line, delay, profile.timing),
            edge,
            timeout,
            context,
        )
        .with_background(profile.suspend_background.then_some(background))
    }
}

impl<'a, L, D, E, T, B> InterruptDecoder<'a, L, D, E, T, B>
where
    L: DataLine,
    D: DelayNs,
    E: EdgeInterrupt,
    T: TimeoutSource,
    B: BackgroundInterrupts,
{
    /// Pauses `background` for the length of every transaction.
    pub fn with_background<B2: BackgroundInterrupts>(
        self,
        background: B2,
    ) -> InterruptDecoder<'a, L, D, E, T, B2> {
        InterruptDecoder {
            driver: self.driver,
            edge: self.edge,
            timeout: self.timeout,
            background,
            context: self.context,
        }
    }

    /// Returns the parts the decoder was built from.
    pub fn free(self) -> (LineDriver<L, D>, E, T, B) {
        (self.driver, self.edge, self.timeout, self.background)
    }
}

impl<L, D, E, T, B> Transport for InterruptDecoder<'_, L, D, E, T, B>
where
    L: DataLine,
    D: DelayNs,
    E: EdgeInterrupt,
    T: TimeoutSource,
    B: BackgroundInterrupts,
{
    fn begin(&mut self) {
        self.driver.release();
        critical_section::with(|_| self.edge.prepare());
    }

    fn run_command(&mut self, command: &[u8], reply: &mut [u8]) -> Result<(), Error> {
        let kind = match validate(command, reply.len()) {
            Ok(kind) => kind,
            Err(e) => {
                warn!("rejected command: {:?}", e);
                return Err(e);
            }
        };
        reply.fill(0);
        let expected = reply.len();
        self.context.reset();

        {
            let _paused = Suspended::new(&mut self.background);
            self.timeout.arm();
            critical_section::with(|_| {
                self.driver.send_command(command);
                self.edge.enable();
            });

            while self.context.received() < expected && !self.timeout.expired() {
                core::hint::spin_loop();
            }

            self.edge.disable();
            self.timeout.disarm();
        }

        // A reply completed right at the deadline still counts
        let received = self.context.copy_into(reply);
        if received >= expected {
            trace!("{:?} complete, {} bytes", kind, expected);
            Ok(())
        } else {
            warn!("{:?} timed out after {} of {} bytes", kind, received, expected);
            Err(Error::Timeout { received, expected })
        }
    }
}
