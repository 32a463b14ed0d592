//! Bus line access and command transmission.
//!
//! The data line is open-drain: the console (us) and the controller only ever pull
//! it low, and a pull-up brings it back high when nobody drives it. [`DataLine`] is
//! the three-operation capability a board has to provide, [`OpenDrainLine`] adapts
//! any `embedded-hal` pin that can both be driven and read.
//!
//! [`LineDriver`] turns command bytes into pulses:
//!
//! | Symbol | Low     | Released |
//! |--------|---------|----------|
//! | `0`    | 3 units | 1 unit   |
//! | `1`    | 1 unit  | 3 units  |
//! | stop   | 1 unit  | `stop_release_ns` |
//!
//! with one unit = [`BusTiming::quantum_ns`] (1 µs nominal).

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::consts::{BIT_CELL_US, QUANTUM_NS, STOP_BIT_US};

/// Pin-level operations on the bus.
///
/// Implementations must be as cheap as possible; they are called between delays that
/// are only a microsecond long.
pub trait DataLine {
    /// Pull the line low.
    fn drive_low(&mut self);

    /// Stop driving the line and let the pull-up take it high (Hi-Z).
    fn release(&mut self);

    /// Sample the current line level.
    fn is_high(&mut self) -> bool;
}

/// A [`DataLine`] over an open-drain `embedded-hal` pin.
///
/// `set_low` drives the line, `set_high` releases it. Pin errors are ignored while
/// sending and read as the idle (high) level while sampling.
#[derive(Debug)]
pub struct OpenDrainLine<P> {
    pin: P,
}

impl<P> OpenDrainLine<P>
where
    P: OutputPin + InputPin,
{
    /// Wraps the pin and releases the line.
    pub fn new(pin: P) -> Self {
        let mut line = Self { pin };
        line.release();
        line
    }

    /// Returns the wrapped pin.
    pub fn free(self) -> P {
        self.pin
    }
}

impl<P> DataLine for OpenDrainLine<P>
where
    P: OutputPin + InputPin,
{
    #[inline(always)]
    fn drive_low(&mut self) {
        let _ = self.pin.set_low();
    }

    #[inline(always)]
    fn release(&mut self) {
        let _ = self.pin.set_high();
    }

    #[inline(always)]
    fn is_high(&mut self) -> bool {
        self.pin.is_high().unwrap_or(true)
    }
}

/// Phase lengths used by [`LineDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct BusTiming {
    /// Length of one unit, in nanoseconds. Nominally 1 µs.
    pub quantum_ns: u32,
    /// How long the line stays released after the stop pulse.
    ///
    /// Nominally 2 µs. Shortening it leaves time to arm reception before the
    /// controller's first falling edge.
    pub stop_release_ns: u32,
    /// Time spent toggling the pin, subtracted from every phase.
    pub toggle_overhead_ns: u32,
}

impl BusTiming {
    /// Nominal timing: 1 µs units, a [`STOP_BIT_US`] stop (1 µs low, 2 µs released),
    /// no overhead compensation.
    pub const STANDARD: Self = Self {
        quantum_ns: QUANTUM_NS,
        stop_release_ns: (STOP_BIT_US - 1) * QUANTUM_NS,
        toggle_overhead_ns: 0,
    };

    /// Nominal units with the stop release cut to 1 µs, for interrupt-driven reception.
    pub const FAST_ARM: Self = Self {
        quantum_ns: QUANTUM_NS,
        stop_release_ns: QUANTUM_NS,
        toggle_overhead_ns: 0,
    };

    /// Same timing with a per-toggle overhead compensation.
    pub const fn with_overhead(self, toggle_overhead_ns: u32) -> Self {
        Self {
            toggle_overhead_ns,
            ..self
        }
    }

    /// Same timing with the nominal stop release of [`STANDARD`](Self::STANDARD).
    ///
    /// Used where nothing has to be armed between the stop bit and the reply.
    pub const fn with_nominal_stop(self) -> Self {
        Self {
            stop_release_ns: Self::STANDARD.stop_release_ns,
            ..self
        }
    }

    /// Delay for a phase lasting `units` quanta.
    pub const fn phase_ns(&self, units: u32) -> u32 {
        (units * self.quantum_ns).saturating_sub(self.toggle_overhead_ns)
    }

    /// Deviation of one transmitted byte from its nominal 32 µs, in nanoseconds.
    ///
    /// Counts the quantum drift over 8 cells plus the toggle overhead that the
    /// saturating subtraction could not absorb.
    pub const fn byte_error_ns(&self) -> u32 {
        let nominal = 8 * BIT_CELL_US * QUANTUM_NS;
        let cell = 4 * self.quantum_ns;
        let actual = 8 * cell;
        let drift = if actual > nominal {
            actual - nominal
        } else {
            nominal - actual
        };
        let unabsorbed = self.toggle_overhead_ns.saturating_sub(self.quantum_ns);
        drift + 16 * unabsorbed
    }

    /// Whether a byte's accumulated error stays under half a bit cell.
    pub const fn is_within_budget(&self) -> bool {
        self.byte_error_ns() < BIT_CELL_US * QUANTUM_NS / 2
    }
}

impl Default for BusTiming {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Sends console commands on a [`DataLine`].
///
/// # Type Parameters
/// - `L`: the bus line
/// - `D`: a delay provider implementing [`DelayNs`]
///
/// ## Example
///
/// ```rust
/// # use embedded_hal_mock::eh1::delay::NoopDelay;
/// # use embedded_hal_mock::eh1::digital::{Mock, State, Transaction};
/// use n64pad::line::{BusTiming, LineDriver, OpenDrainLine};
///
/// # let mut expectations = Vec::new();
/// # expectations.push(Transaction::set(State::High));
/// # expectations.push(Transaction::set(State::High));
/// # for _ in 0..9 {
/// #     expectations.push(Transaction::set(State::Low));
/// #     expectations.push(Transaction::set(State::High));
/// # }
/// # let pin = Mock::new(&expectations);
/// # let delay = NoopDelay::new();
/// let mut driver = LineDriver::new(OpenDrainLine::new(pin), delay, BusTiming::STANDARD);
/// driver.send_command(&[0x01]); // POLL
/// # let (line, _) = driver.free();
/// # line.free().done();
/// ```
///
/// ## Notes
/// - Must run with interrupts disabled: a single interrupt in the middle of a cell
///   makes the controller misread or ignore the command.
/// - Always leaves the line released.
#[derive(Debug)]
pub struct LineDriver<L, D> {
    line: L,
    delay: D,
    timing: BusTiming,
}

impl<L, D> LineDriver<L, D>
where
    L: DataLine,
    D: DelayNs,
{
    /// Creates a driver and releases the line.
    pub fn new(line: L, delay: D, timing: BusTiming) -> Self {
        let mut driver = Self {
            line,
            delay,
            timing,
        };
        driver.line.release();
        driver
    }

    /// Timing in use.
    pub fn timing(&self) -> BusTiming {
        self.timing
    }

    /// Releases the line (Hi-Z).
    pub fn release(&mut self) {
        self.line.release();
    }

    /// Mutable access to the line, for sampling the reply.
    pub fn line_mut(&mut self) -> &mut L {
        &mut self.line
    }

    /// Returns the line and delay provider.
    pub fn free(self) -> (L, D) {
        (self.line, self.delay)
    }

    #[inline(always)]
    fn hold(&mut self, units: u32) {
        self.delay.delay_ns(self.timing.phase_ns(units));
    }

    #[inline(always)]
    fn pulse(&mut self, low_units: u32, high_units: u32) {
        self.line.drive_low();
        self.hold(low_units);
        self.line.release();
        self.hold(high_units);
    }

    /// Line low for 3 units, released for 1.
    #[inline(always)]
    pub fn send_zero(&mut self) {
        self.pulse(3, 1);
    }

    /// Line low for 1 unit, released for 3.
    #[inline(always)]
    pub fn send_one(&mut self) {
        self.pulse(1, 3);
    }

    /// Console stop bit: line low for 1 unit, released for `stop_release_ns`.
    #[inline(always)]
    pub fn send_stop(&mut self) {
        self.line.drive_low();
        self.hold(1);
        self.line.release();
        self.delay
            .delay_ns(self.timing.stop_release_ns.saturating_sub(self.timing.toggle_overhead_ns));
    }

    /// Sends `bytes` MSB first, followed by a single stop bit.
    pub fn send_command(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let mut shifted = byte;
            for _ in 0..8 {
                if shifted & 0x80 != 0 {
                    self.send_one();
                } else {
                    self.send_zero();
                }
                shifted <<= 1;
            }
        }
        self.send_stop();
    }
}
