//! Simulated bus participants for unit tests.
//!
//! - [`Recorder`] captures what the console side puts on the line, as
//!   `(low_ns, high_ns)` pulses.
//! - [`ControllerLine`] plays back a controller reply, one sample per `is_high` call.
//! - [`decode_console_waveform`] is an independent reference decoder for recorded
//!   pulses.

#![allow(dead_code)]

use core::cell::RefCell;
use embedded_hal::delay::DelayNs;
use std::rc::Rc;
use std::vec::Vec;

use crate::line::DataLine;

#[derive(Debug, Default)]
struct Trace {
    driven: bool,
    pulses: Vec<(u32, u32)>,
}

/// Records line activity and delays into a shared pulse list.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    trace: Rc<RefCell<Trace>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self) -> RecordingLine {
        RecordingLine {
            trace: self.trace.clone(),
        }
    }

    pub fn delay(&self) -> RecordingDelay {
        RecordingDelay {
            trace: self.trace.clone(),
        }
    }

    pub fn pulses(&self) -> Vec<(u32, u32)> {
        self.trace.borrow().pulses.clone()
    }

    pub fn is_released(&self) -> bool {
        !self.trace.borrow().driven
    }
}

#[derive(Debug)]
pub struct RecordingLine {
    trace: Rc<RefCell<Trace>>,
}

impl DataLine for RecordingLine {
    fn drive_low(&mut self) {
        let mut trace = self.trace.borrow_mut();
        trace.driven = true;
        trace.pulses.push((0, 0));
    }

    fn release(&mut self) {
        self.trace.borrow_mut().driven = false;
    }

    fn is_high(&mut self) -> bool {
        !self.trace.borrow().driven
    }
}

#[derive(Debug)]
pub struct RecordingDelay {
    trace: Rc<RefCell<Trace>>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        let mut trace = self.trace.borrow_mut();
        let driven = trace.driven;
        if let Some(last) = trace.pulses.last_mut() {
            if driven {
                last.0 += ns;
            } else {
                last.1 += ns;
            }
        }
    }
}

/// Decodes console pulses: every pulse but the last is a bit (`1` when the line was
/// released longer than it was held low), the last is the stop bit.
pub fn decode_console_waveform(pulses: &[(u32, u32)]) -> Vec<u8> {
    let (_stop, bits) = pulses.split_last().expect("waveform without stop bit");
    assert_eq!(bits.len() % 8, 0, "waveform is not byte aligned");
    bits.chunks(8)
        .map(|byte| {
            byte.iter()
                .fold(0u8, |acc, &(low, high)| (acc << 1) | u8::from(high > low))
        })
        .collect()
}

/// Bits of `bytes`, MSB first.
pub fn bits_of(bytes: &[u8]) -> impl Iterator<Item = bool> + '_ {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |i| byte & (1 << i) != 0))
}

/// Line levels of a controller reply as `(level, duration_ns)` segments.
pub fn reply_waveform(bytes: &[u8], with_stop: bool) -> Vec<(bool, u32)> {
    let mut segments = Vec::new();
    for bit in bits_of(bytes) {
        if bit {
            segments.push((false, 1_000));
            segments.push((true, 3_000));
        } else {
            segments.push((false, 3_000));
            segments.push((true, 1_000));
        }
    }
    if with_stop {
        segments.push((false, 2_000));
    }
    segments
}

/// A controller that answers every command with the same reply.
///
/// Time restarts whenever the console drives the line, so the reply replays after
/// each command. Each `is_high` call advances time by one sample period.
#[derive(Debug)]
pub struct ControllerLine {
    waveform: Vec<(bool, u32)>,
    lead_ns: u32,
    step_ns: u32,
    now_ns: u32,
    driven: bool,
    pub pulses_seen: usize,
    pub samples: usize,
}

impl ControllerLine {
    /// Replies `bytes` (plus the controller stop bit) `lead_ns` after the console
    /// releases the line, sampled `samples_per_us` times per microsecond.
    pub fn replying(bytes: &[u8], samples_per_us: u32) -> Self {
        Self::with_waveform(reply_waveform(bytes, true), samples_per_us)
    }

    /// Sends `bytes` and then lets the line float high without a stop bit.
    pub fn truncated(bytes: &[u8], samples_per_us: u32) -> Self {
        Self::with_waveform(reply_waveform(bytes, false), samples_per_us)
    }

    /// Never pulls the line.
    pub fn silent(samples_per_us: u32) -> Self {
        Self::with_waveform(Vec::new(), samples_per_us)
    }

    /// Pulls the line low and never lets go.
    pub fn stuck_low(samples_per_us: u32) -> Self {
        Self::with_waveform(Vec::from([(false, u32::MAX)]), samples_per_us)
    }

    fn with_waveform(waveform: Vec<(bool, u32)>, samples_per_us: u32) -> Self {
        Self {
            waveform,
            lead_ns: 2_000,
            step_ns: 1_000 / samples_per_us,
            now_ns: 0,
            driven: false,
            pulses_seen: 0,
            samples: 0,
        }
    }

    fn level_at(&self, t: u32) -> bool {
        if t < self.lead_ns {
            return true;
        }
        let mut start = self.lead_ns;
        for &(level, duration) in &self.waveform {
            if t - start < duration {
                return level;
            }
            start += duration;
        }
        true
    }
}

impl DataLine for ControllerLine {
    fn drive_low(&mut self) {
        if !self.driven {
            self.now_ns = 0;
        }
        self.driven = true;
    }

    fn release(&mut self) {
        if self.driven {
            self.pulses_seen += 1;
        }
        self.driven = false;
        self.now_ns = 0;
    }

    fn is_high(&mut self) -> bool {
        if self.driven {
            return false;
        }
        let level = self.level_at(self.now_ns);
        self.now_ns = self.now_ns.saturating_add(self.step_ns);
        self.samples += 1;
        level
    }
}
