//! Busy-wait reply decoder.
//!
//! The whole transaction, command and reply, runs inside one
//! `critical_section::with`. Nothing can preempt the sampling loop, which makes the
//! decoder fully deterministic but keeps the CPU to itself for up to
//! [`COMMAND_TIMEOUT_US`](crate::consts::COMMAND_TIMEOUT_US) plus the reply time.
//!
//! ## Decoding
//!
//! Each reply bit starts with a falling edge. After the first edge, the decoder
//! counts high samples until the next high→low transition; a cell with at least
//! [`SamplingRate::one_threshold`] high samples is a `1`. The last cell may run into
//! an idle line instead of a stop bit, and is then judged by its low phase.
//!
//! Every wait is bounded: a controller that never answers, or stops mid-reply,
//! produces [`Error::Timeout`] instead of a hang.
//!
//! ```rust
//! # use embedded_hal_mock::eh1::delay::NoopDelay;
//! # use embedded_hal_mock::eh1::digital::{Mock, State, Transaction};
//! use n64pad::line::{BusTiming, LineDriver, OpenDrainLine};
//! use n64pad::polling::PollingDecoder;
//! use n64pad::profile::SamplingRate;
//! use n64pad::{Error, Transport};
//!
//! # let mut expectations = Vec::new();
//! # expectations.push(Transaction::set(State::High));
//! # expectations.push(Transaction::set(State::High));
//! # // POLL (0x01) and its stop bit
//! # for _ in 0..9 {
//! #     expectations.push(Transaction::set(State::Low));
//! #     expectations.push(Transaction::set(State::High));
//! # }
//! # // Nobody answers
//! # for _ in 0..4 {
//! #     expectations.push(Transaction::get(State::High));
//! # }
//! # expectations.push(Transaction::set(State::High));
//! # let pin = Mock::new(&expectations);
//! # let delay = NoopDelay::new();
//! let driver = LineDriver::new(OpenDrainLine::new(pin), delay, BusTiming::STANDARD);
//! let mut protocol = PollingDecoder::from_driver(driver, SamplingRate::new(1), 4);
//! protocol.begin();
//!
//! let mut reply = [0u8; 4];
//! assert_eq!(
//!     protocol.run_command(&[0x01], &mut reply),
//!     Err(Error::Timeout { received: 0, expected: 4 })
//! );
//! # let (line, _) = protocol.free().free();
//! # line.free().done();
//! ```

use embedded_hal::delay::DelayNs;

use crate::command::validate;
use crate::error::Error;
use crate::line::{DataLine, LineDriver};
use crate::profile::{SamplingRate, TargetProfile};
use crate::transport::Transport;

/// Why sampling stopped early, with the number of complete bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stalled(usize);

/// A [`Transport`] that samples the reply with interrupts disabled.
///
/// # Type Parameters
/// - `L`: the bus line
/// - `D`: a delay provider used for command timing
#[derive(Debug)]
pub struct PollingDecoder<L, D> {
    driver: LineDriver<L, D>,
    sampling: SamplingRate,
    budget_us: u32,
}

impl<L, D> PollingDecoder<L, D>
where
    L: DataLine,
    D: DelayNs,
{
    /// Creates a decoder using the timing and sample rate of `profile`.
    ///
    /// Sampling starts right after the stop bit, so the stop keeps its nominal length
    /// even on profiles that shorten it for interrupt-driven reception.
    pub fn new(line: L, delay: D, profile: &TargetProfile) -> Self {
        Self::from_driver(
            LineDriver::new(line, delay, profile.timing.with_nominal_stop()),
            profile.sampling,
            profile.budget_us(),
        )
    }

    /// Creates a decoder from an existing line driver.
    ///
    /// # Arguments
    /// - `driver`: the line driver sending commands
    /// - `sampling`: how many line samples the decode loop takes per microsecond
    /// - `budget_us`: how long to wait for the controller's first edge
    pub fn from_driver(driver: LineDriver<L, D>, sampling: SamplingRate, budget_us: u32) -> Self {
        Self {
            driver,
            sampling,
            budget_us,
        }
    }

    /// Returns the line driver.
    pub fn free(self) -> LineDriver<L, D> {
        self.driver
    }

    fn receive(&mut self, reply: &mut [u8]) -> Result<(), Stalled> {
        let threshold = self.sampling.one_threshold();
        let cell_limit = self.sampling.cell_limit();
        let line = self.driver.line_mut();

        // Wait for the first falling edge
        let mut budget = self.sampling.first_edge_limit(self.budget_us);
        while line.is_high() {
            budget = budget.saturating_sub(1);
            if budget == 0 {
                return Err(Stalled(0));
            }
        }

        let total = reply.len() * 8;
        for i in 0..total {
            let mut high: u16 = 0;
            let mut low: u16 = 0;
            let mut prev = false;
            let mut samples: u32 = 0;
            let idle = loop {
                let level = line.is_high();
                if level {
                    high = high.saturating_add(1);
                } else if prev {
                    // Falling edge, new bit
                    break false;
                } else {
                    low = low.saturating_add(1);
                }
                prev = level;
                samples += 1;
                if samples >= cell_limit {
                    if !prev {
                        return Err(Stalled(i / 8));
                    }
                    break true;
                }
            };

            // An idle line never ends the high phase, so judge those cells by the low one
            let one = if idle {
                low < threshold
            } else {
                high >= threshold
            };
            let byte = &mut reply[i / 8];
            *byte = (*byte << 1) | u8::from(one);

            // The line went idle: fine after the last bit, a truncated reply otherwise
            if idle && i + 1 < total {
                return Err(Stalled((i + 1) / 8));
            }
        }
        Ok(())
    }
}

impl<L, D> Transport for PollingDecoder<L, D>
where
    L: DataLine,
    D: DelayNs,
{
    fn begin(&mut self) {
        self.driver.release();
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

        let result = critical_section::with(|_| {
            self.driver.send_command(command);
            self.receive(reply)
        });
        self.driver.release();

        match result {
            Ok(()) => {
                trace!("{:?} complete, {} bytes", kind, reply.len());
                Ok(())
            }
            Err(Stalled(received)) => {
                reply[received..].fill(0);
                warn!("{:?} timed out after {} of {} bytes", kind, received, reply.len());
                Err(Error::Timeout {
                    received,
                    expected: reply.len(),
                })
            }
        }
    }
}
