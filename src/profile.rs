//! Per-target configuration.
//!
//! A [`TargetProfile`] gathers everything that depends on the microcontroller:
//! line timing, how fast the polling decoder samples the line, and which timeout
//! resource bounds an interrupt-driven read. Profiles are plain `const` values, so
//! the board picks one at build time and the compiler folds the numbers in.
//!
//! Timer helpers (for [`TimeoutStrategy::HardwareCountdown`] on AVR-style CTC timers):
//! - `compute_timer_compare`: runtime compare-value calculator
//! - `const_timer_compare`: compile-time compare-value calculator
//!
//! Common values at 16 MHz:
//!
//! | PRESCALER | TIMEOUT | COMPARE |
//! |-----------|---------|---------|
//! |         1 |  500 µs |    7999 |
//! |         8 |  500 µs |     999 |
//! |        64 | 1000 µs |     249 |

use libm::round;

use crate::consts::{BIT_CELL_US, COMMAND_TIMEOUT_US};
use crate::line::BusTiming;

/// 1,000,000 microseconds = 1 second
pub const MICROSECONDS_PER_SECOND: u32 = 1_000_000;

/// How fast the polling decoder reads the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct SamplingRate {
    /// Line samples taken per microsecond by the decode loop.
    pub samples_per_us: u16,
}

impl SamplingRate {
    /// A rate of `samples_per_us` samples per microsecond (at least 1).
    pub const fn new(samples_per_us: u16) -> Self {
        Self {
            samples_per_us: if samples_per_us == 0 { 1 } else { samples_per_us },
        }
    }

    /// Derives the rate from the CPU clock and the cost of one decode-loop iteration.
    ///
    /// # Arguments
    /// - `f_cpu`: CPU frequency in Hz
    /// - `cycles_per_sample`: CPU cycles spent per line sample
    pub const fn from_cycles(f_cpu: u32, cycles_per_sample: u32) -> Self {
        let cycles_per_us = f_cpu / MICROSECONDS_PER_SECOND;
        let cycles = if cycles_per_sample == 0 { 1 } else { cycles_per_sample };
        Self::new((cycles_per_us / cycles) as u16)
    }

    /// High samples needed inside one cell to read it as a `1`.
    ///
    /// A `0` cell is released for about 1 µs, a `1` cell for about 3 µs. The
    /// threshold sits halfway, at 2 µs worth of samples.
    pub const fn one_threshold(&self) -> u16 {
        2 * self.samples_per_us
    }

    /// Samples after which a single cell is considered over: two bit cells.
    pub const fn cell_limit(&self) -> u32 {
        2 * BIT_CELL_US * self.samples_per_us as u32
    }

    /// Samples to wait for the controller's first falling edge.
    pub const fn first_edge_limit(&self, budget_us: u32) -> u32 {
        budget_us.saturating_mul(self.samples_per_us as u32)
    }
}

/// How an interrupt-driven read is bounded in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TimeoutStrategy {
    /// Compare timestamps from a free-running microsecond clock.
    FreeRunningClock {
        /// Transaction budget in microseconds.
        budget_us: u32,
    },
    /// Poll a flag raised by a dedicated countdown timer, for targets whose
    /// free-running clock is paused during the transaction.
    HardwareCountdown {
        /// Timer prescaler.
        prescaler: u32,
        /// CTC compare value.
        compare: u16,
    },
}

/// Build-time description of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct TargetProfile {
    /// Short target name, for logs.
    pub name: &'static str,
    /// CPU frequency in Hz.
    pub f_cpu_hz: u32,
    /// Line timing.
    pub timing: BusTiming,
    /// Polling decoder sample rate.
    pub sampling: SamplingRate,
    /// Timeout resource for the interrupt-driven decoder.
    pub timeout: TimeoutStrategy,
    /// Whether tick/serial/USB interrupts must be paused during a transaction.
    pub suspend_background: bool,
}

impl TargetProfile {
    /// Transaction budget in microseconds, whichever strategy is used.
    pub fn budget_us(&self) -> u32 {
        match self.timeout {
            TimeoutStrategy::FreeRunningClock { budget_us } => budget_us,
            TimeoutStrategy::HardwareCountdown { prescaler, compare } => {
                let ticks = compare as u64 + 1;
                (ticks * prescaler as u64 * MICROSECONDS_PER_SECOND as u64 / self.f_cpu_hz as u64)
                    as u32
            }
        }
    }

    /// Compare value to program when the profile uses a hardware countdown.
    pub fn countdown_compare(&self) -> Option<u16> {
        match self.timeout {
            TimeoutStrategy::HardwareCountdown { compare, .. } => Some(compare),
            TimeoutStrategy::FreeRunningClock { .. } => None,
        }
    }
}

/// ATmega328P at 16 MHz (Uno, Nano). `micros()` stays usable during a read.
pub const ATMEGA328P: TargetProfile = TargetProfile {
    name: "atmega328p",
    f_cpu_hz: 16_000_000,
    timing: BusTiming::FAST_ARM.with_overhead(125),
    sampling: SamplingRate::from_cycles(16_000_000, 8),
    timeout: TimeoutStrategy::FreeRunningClock {
        budget_us: COMMAND_TIMEOUT_US,
    },
    suspend_background: false,
};

/// ATmega32U4 at 16 MHz (Leonardo, Pro Micro).
///
/// The tick timer and USB interrupts must be paused to read reliably, so a
/// dedicated timer bounds the read instead of `micros()`.
pub const ATMEGA32U4: TargetProfile = TargetProfile {
    name: "atmega32u4",
    f_cpu_hz: 16_000_000,
    timing: BusTiming::FAST_ARM.with_overhead(125),
    sampling: SamplingRate::from_cycles(16_000_000, 8),
    timeout: TimeoutStrategy::HardwareCountdown {
        prescaler: 1,
        compare: const_timer_compare(16_000_000, 1, COMMAND_TIMEOUT_US),
    },
    suspend_background: true,
};

/// ATtiny85 on its 16 MHz PLL clock (Digispark).
pub const ATTINY85: TargetProfile = TargetProfile {
    name: "attiny85",
    f_cpu_hz: 16_000_000,
    timing: BusTiming::STANDARD.with_overhead(125),
    sampling: SamplingRate::from_cycles(16_000_000, 8),
    timeout: TimeoutStrategy::FreeRunningClock {
        budget_us: COMMAND_TIMEOUT_US,
    },
    suspend_background: false,
};

/// Computes the compare value for a CTC timer firing after `timeout_us`.
///
/// # Arguments
/// - `f_cpu`: CPU frequency in Hz
/// - `prescaler`: timer prescaler (e.g., 1, 8, 64)
/// - `timeout_us`: desired interval in microseconds
///
/// # Returns
/// - Compare value (rounds to nearest integer, saturates at `u16::MAX`)
pub fn compute_timer_compare(f_cpu: u32, prescaler: u32, timeout_us: f32) -> u16 {
    let ticks_per_us = f_cpu as f64 / prescaler as f64 / MICROSECONDS_PER_SECOND as f64;
    let ticks = round(ticks_per_us * timeout_us as f64);
    if ticks < 1.0 {
        0
    } else if ticks > u16::MAX as f64 + 1.0 {
        u16::MAX
    } else {
        (ticks - 1.0) as u16
    }
}

/// Compile-time compare value calculator
///
/// # Arguments
/// - `f_cpu`: CPU frequency in Hz
/// - `prescaler`: timer prescaler (e.g., 1, 8, 64)
/// - `timeout_us`: desired interval in whole microseconds
///
/// # Returns
/// - Compare value (truncates, saturates at `u16::MAX`)
pub const fn const_timer_compare(f_cpu: u32, prescaler: u32, timeout_us: u32) -> u16 {
    let ticks = (f_cpu / prescaler) as u64 * timeout_us as u64 / MICROSECONDS_PER_SECOND as u64;
    if ticks == 0 {
        0
    } else if ticks > u16::MAX as u64 + 1 {
        u16::MAX
    } else {
        (ticks - 1) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_values_match_table() {
        assert_eq!(const_timer_compare(16_000_000, 1, 500), 7999);
        assert_eq!(const_timer_compare(16_000_000, 8, 500), 999);
        assert_eq!(const_timer_compare(16_000_000, 64, 1000), 249);
        assert_eq!(compute_timer_compare(16_000_000, 1, 500.0), 7999);
        assert_eq!(compute_timer_compare(16_000_000, 8, 500.0), 999);
    }

    #[test]
    fn test_compare_saturates() {
        assert_eq!(const_timer_compare(16_000_000, 1, 1_000_000), u16::MAX);
        assert_eq!(compute_timer_compare(16_000_000, 1, 1_000_000.0), u16::MAX);
        assert_eq!(const_timer_compare(1_000_000, 1, 0), 0);
    }

    #[test]
    fn test_threshold_scales_with_rate() {
        let rate = SamplingRate::from_cycles(16_000_000, 8);
        assert_eq!(rate.samples_per_us, 2);
        assert_eq!(rate.one_threshold(), 4);
        assert_eq!(rate.cell_limit(), 16);
        assert_eq!(SamplingRate::new(0).samples_per_us, 1);
        assert_eq!(SamplingRate::from_cycles(1_000_000, 8).samples_per_us, 1);
    }

    #[test]
    fn test_profiles_cover_worst_case_reply() {
        for profile in [ATMEGA328P, ATMEGA32U4, ATTINY85] {
            assert_eq!(profile.budget_us(), COMMAND_TIMEOUT_US, "{}", profile.name);
            assert!(profile.timing.is_within_budget(), "{}", profile.name);
        }
        assert_eq!(ATMEGA32U4.countdown_compare(), Some(7999));
        assert_eq!(ATMEGA328P.countdown_compare(), None);
    }
}
