use super::request::PaymentReceipt;
use crate::config::{CHUNK_GROWTH_FACTOR, CHUNK_SHRINK_FACTOR};
use crate::domain::amount::{Amount, ratio, units_to_deliver};
use crate::domain::packet::PaymentId;
use rust_decimal::Decimal;
use std::time::Duration;

/// Which side of a payment is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Send exactly this much; deliver whatever the path yields.
    FixedSource(Amount),
    /// Deliver at least this much; send whatever it takes.
    FixedDestination(Amount),
}

/// Running state of one payment.
///
/// Owned by exactly one `send`/`deliver` call and threaded through every
/// iteration of the chunk loop. Nothing in here is shared between payments.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSession {
    pub payment_id: PaymentId,
    pub sequence: u64,
    pub amount_sent: Amount,
    pub amount_delivered: Amount,
    pub chunk_size: Amount,
    /// `amount_delivered / amount_sent`, once anything has been sent.
    pub rate: Option<Decimal>,
    pub last_chunk: bool,
    pub time_to_wait: Duration,
    pub num_chunks: u64,
    pub consecutive_rejections: u32,
}

impl PaymentSession {
    pub fn new(payment_id: PaymentId, initial_chunk_size: Amount) -> Self {
        Self {
            payment_id,
            sequence: 0,
            amount_sent: Amount::ZERO,
            amount_delivered: Amount::ZERO,
            chunk_size: initial_chunk_size.max(Amount::ONE),
            rate: None,
            last_chunk: false,
            time_to_wait: Duration::ZERO,
            num_chunks: 0,
            consecutive_rejections: 0,
        }
    }

    /// Sizes the next chunk, or returns `None` once the target is met.
    ///
    /// Sets `last_chunk` when the remaining amount fits in one chunk, in which
    /// case the chunk size is clamped to exactly that remainder.
    pub fn next_chunk(&mut self, target: Target) -> Option<Amount> {
        let left_to_send = match target {
            Target::FixedSource(source_amount) => {
                Some(source_amount.saturating_sub(self.amount_sent))
            }
            Target::FixedDestination(destination_amount) => {
                let left_to_deliver = destination_amount.saturating_sub(self.amount_delivered);
                if left_to_deliver.is_zero() {
                    return None;
                }
                if self.amount_sent.is_zero() {
                    // No exchange rate yet, only the chunk size limits the first chunk.
                    None
                } else {
                    let rate =
                        ratio(self.amount_delivered, self.amount_sent).unwrap_or(Decimal::ZERO);
                    self.rate = Some(rate);
                    // Nothing delivered yet: keep growing chunks until one gets through.
                    units_to_deliver(left_to_deliver, rate)
                }
            }
        };

        self.last_chunk = false;
        if let Some(left) = left_to_send {
            if left.is_zero() {
                return None;
            }
            if left <= self.chunk_size {
                self.chunk_size = left;
                self.last_chunk = true;
            }
        }
        Some(self.chunk_size)
    }

    /// Least amount the receiver should accept for the current chunk.
    pub fn minimum_to_accept(&self) -> Amount {
        self.rate
            .map(|rate| self.chunk_size.scale_floor(rate))
            .unwrap_or(Amount::ZERO)
    }

    /// Books a fulfilled chunk and grows the next one.
    pub fn record_fulfilled(&mut self, amount: Amount) {
        self.amount_sent += amount;
        self.num_chunks += 1;
        self.chunk_size = self
            .chunk_size
            .scale_rounded(CHUNK_GROWTH_FACTOR)
            .clamp(Amount::ONE, Amount::max_wire());
        self.time_to_wait = Duration::ZERO;
        self.consecutive_rejections = 0;
    }

    /// Halves the chunk size and doubles the wait. Returns how long to sleep.
    pub fn record_retryable(&mut self, min_backoff: Duration) -> Duration {
        self.chunk_size = self.chunk_size.scale_rounded(CHUNK_SHRINK_FACTOR).max(Amount::ONE);
        self.time_to_wait = self.time_to_wait.saturating_mul(2).max(min_backoff);
        self.consecutive_rejections += 1;
        self.time_to_wait
    }

    pub fn record_application_rejection(&mut self) {
        self.consecutive_rejections += 1;
    }

    pub fn receipt(&self) -> PaymentReceipt {
        PaymentReceipt {
            source_amount: self.amount_sent,
            destination_amount: self.amount_delivered,
            num_chunks: self.num_chunks,
        }
    }
}
