use core::sync::atomic::{AtomicU8, Ordering};

use embedded_hal::digital::InputPin;

use crate::consts::MAX_REPLY_LEN;

/// State shared between the edge interrupt handler and the waiting caller.
///
/// The handler is the only writer while a transaction is in flight; the caller only
/// reads [`received`](Self::received) while spinning, and copies the scratch bytes
/// out once the edge interrupt is disabled. Everything is a byte-wide atomic, so a
/// `static` context needs no lock.
///
/// Declare one with [`transaction_context!`](crate::transaction_context) and hand a
/// reference to both the decoder and the ISR:
///
/// ```rust,ignore
/// n64pad::transaction_context!(PAD_CTX);
///
/// #[interrupt]
/// fn INT0() {
///     PAD_CTX.on_falling_edge(data_pin_is_high());
/// }
/// ```
#[derive(Debug)]
pub struct TransactionContext {
    /// Bits left in the current byte, 8 down to 1.
    bit: AtomicU8,
    /// Index of the byte being shifted in.
    byte: AtomicU8,
    scratch: [AtomicU8; MAX_REPLY_LEN],
}

impl TransactionContext {
    /// An idle context.
    pub const fn new() -> Self {
        Self {
            bit: AtomicU8::new(8),
            byte: AtomicU8::new(0),
            scratch: [const { AtomicU8::new(0) }; MAX_REPLY_LEN],
        }
    }

    /// Clears the scratch buffer and rewinds to the first bit of the first byte.
    ///
    /// Must only be called while the edge interrupt is disabled.
    pub fn reset(&self) {
        for slot in &self.scratch {
            slot.store(0, Ordering::Relaxed);
        }
        self.bit.store(8, Ordering::Relaxed);
        self.byte.store(0, Ordering::Release);
    }

    /// Number of complete bytes shifted in so far.
    #[inline(always)]
    pub fn received(&self) -> usize {
        self.byte.load(Ordering::Acquire) as usize
    }

    /// Edge handler: shifts in one bit.
    ///
    /// Call once per falling edge with the line level sampled in the middle of the
    /// cell (high means `1`). Edges beyond the scratch capacity, like the
    /// controller's stop bit after an 8-byte reply, are ignored.
    #[inline(always)]
    pub fn on_falling_edge(&self, bit: bool) {
        let byte = self.byte.load(Ordering::Relaxed);
        let Some(slot) = self.scratch.get(byte as usize) else {
            return;
        };
        slot.store((slot.load(Ordering::Relaxed) << 1) | u8::from(bit), Ordering::Relaxed);

        let remaining = self.bit.load(Ordering::Relaxed).saturating_sub(1);
        if remaining == 0 {
            self.bit.store(8, Ordering::Relaxed);
            self.byte.store(byte + 1, Ordering::Release);
        } else {
            self.bit.store(remaining, Ordering::Relaxed);
        }
    }

    /// Edge handler variant that times the low pulse instead of trusting the
    /// interrupt latency to land in the middle of the cell.
    ///
    /// Reads `pin` at most `midpoint_samples` times; if the line rises before that,
    /// the cell is a `1`.
    ///
    /// # Arguments
    /// - `pin`: the data line, readable from the ISR
    /// - `midpoint_samples`: pin reads that span half a bit cell (2 µs)
    #[inline(always)]
    pub fn on_falling_edge_measured<P: InputPin>(&self, pin: &mut P, midpoint_samples: u16) {
        let mut rose = false;
        for _ in 0..midpoint_samples {
            if pin.is_high().unwrap_or(false) {
                rose = true;
                break;
            }
        }
        self.on_falling_edge(rose);
    }

    /// Copies the complete bytes into `reply`.
    ///
    /// # Returns
    /// The number of bytes copied: the smaller of [`received`](Self::received) and
    /// `reply.len()`.
    pub fn copy_into(&self, reply: &mut [u8]) -> usize {
        let count = self.received().min(reply.len()).min(MAX_REPLY_LEN);
        for (out, slot) in reply.iter_mut().zip(&self.scratch).take(count) {
            *out = slot.load(Ordering::Relaxed);
        }
        count
    }
}

impl Default for TransactionContext {
    fn default() -> Self {
        Self::new()
    }
}
