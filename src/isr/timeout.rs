use core::sync::atomic::{AtomicBool, Ordering};

use crate::profile::TargetProfile;

/// Something that bounds how long the decoder spins.
pub trait TimeoutSource {
    /// Starts the deadline. Called right before the command is sent.
    fn arm(&mut self);

    /// Whether the deadline has passed. Called on every spin of the wait loop.
    fn expired(&mut self) -> bool;

    /// Stops the deadline once the transaction is over, expired or not.
    fn disarm(&mut self);
}

/// A free-running microsecond counter, allowed to wrap.
pub trait MicrosClock {
    /// Current counter value.
    fn now_us(&mut self) -> u32;
}

/// Deadline measured on a [`MicrosClock`]: `start + budget_us`.
#[derive(Debug)]
pub struct ClockTimeout<C> {
    clock: C,
    budget_us: u32,
    start: u32,
}

impl<C: MicrosClock> ClockTimeout<C> {
    /// A deadline `budget_us` after each [`arm`](TimeoutSource::arm).
    pub fn new(clock: C, budget_us: u32) -> Self {
        Self {
            clock,
            budget_us,
            start: 0,
        }
    }

    /// A deadline of [`TargetProfile::budget_us`] after each arm.
    pub fn for_profile(clock: C, profile: &TargetProfile) -> Self {
        Self::new(clock, profile.budget_us())
    }

    /// Returns the clock.
    pub fn free(self) -> C {
        self.clock
    }
}

impl<C: MicrosClock> TimeoutSource for ClockTimeout<C> {
    fn arm(&mut self) {
        self.start = self.clock.now_us();
    }

    #[inline(always)]
    fn expired(&mut self) -> bool {
        self.clock.now_us().wrapping_sub(self.start) > self.budget_us
    }

    fn disarm(&mut self) {}
}

/// A hardware timer that fires once, some fixed time after being started.
///
/// The interval is configured up front (see
/// [`const_timer_compare`](crate::profile::const_timer_compare)); its interrupt
/// handler calls [`TimeoutFlag::expire`].
pub trait CountdownTimer {
    /// Programs the compare value, with the timer stopped.
    fn set_compare(&mut self, compare: u16);

    /// Resets the counter, clears a pending match and unmasks the timer interrupt.
    fn start(&mut self);

    /// Masks the timer interrupt so it does not fire again.
    fn cancel(&mut self);
}

/// Flag raised by a countdown timer's interrupt handler.
///
/// Declare one with [`timeout_flag!`](crate::timeout_flag).
#[derive(Debug)]
pub struct TimeoutFlag(AtomicBool);

impl TimeoutFlag {
    /// A lowered flag.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Lowers the flag.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Raises the flag.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the flag is raised.
    #[inline(always)]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Timer interrupt handler: raises the flag and stops the timer from retriggering.
    ///
    /// ```rust,ignore
    /// #[interrupt]
    /// fn TIMER1_COMPA() {
    ///     PAD_TIMEOUT.expire(&mut Timer1::steal());
    /// }
    /// ```
    pub fn expire<T: CountdownTimer>(&self, timer: &mut T) {
        self.raise();
        timer.cancel();
    }
}

impl Default for TimeoutFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Deadline enforced by a [`CountdownTimer`] for targets whose free-running clock is
/// paused during a transaction.
#[derive(Debug)]
pub struct CountdownTimeout<'a, T> {
    timer: T,
    flag: &'a TimeoutFlag,
}

impl<'a, T: CountdownTimer> CountdownTimeout<'a, T> {
    /// Uses `timer`, whose interrupt handler raises `flag`.
    pub fn new(timer: T, flag: &'a TimeoutFlag) -> Self {
        Self { timer, flag }
    }

    /// Programs `timer` with the profile's compare value.
    ///
    /// # Returns
    /// `None` when the profile bounds reads with a free-running clock instead, see
    /// [`ClockTimeout::for_profile`].
    pub fn for_profile(mut timer: T, flag: &'a TimeoutFlag, profile: &TargetProfile) -> Option<Self> {
        let compare = profile.countdown_compare()?;
        timer.set_compare(compare);
        Some(Self::new(timer, flag))
    }

    /// Returns the timer.
    pub fn free(self) -> T {
        self.timer
    }
}

impl<T: CountdownTimer> TimeoutSource for CountdownTimeout<'_, T> {
    fn arm(&mut self) {
        self.flag.clear();
        self.timer.start();
    }

    #[inline(always)]
    fn expired(&mut self) -> bool {
        self.flag.is_raised()
    }

    fn disarm(&mut self) {
        self.timer.cancel();
        self.flag.raise();
    }
}
