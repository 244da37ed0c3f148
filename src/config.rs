//! Tunables for the payment loop and the protocol constants behind them.

use crate::domain::amount::Amount;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

/// Rejection code a receiver uses when it attaches an encrypted response.
pub const APPLICATION_REJECTION_CODE: &str = "F99";

/// Rejection codes starting with these are temporary or relative path errors.
pub const RETRYABLE_CODE_PREFIXES: [&str; 2] = ["T", "R"];

/// Chunk size multiplier after a fulfilled chunk.
pub const CHUNK_GROWTH_FACTOR: Decimal = dec!(1.1);

/// Chunk size multiplier after a retryable rejection.
pub const CHUNK_SHRINK_FACTOR: Decimal = dec!(0.5);

pub const DEFAULT_CHUNK_SIZE: u64 = 1000;
pub const DEFAULT_PROBE_AMOUNT: u64 = 1000;
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_millis(100);

/// What to do when a receiver reports less than it already claimed to have received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegressionPolicy {
    /// Keep the higher figure and carry on.
    #[default]
    Ignore,
    /// Treat the response as bad and abort.
    Fail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfig {
    pub initial_chunk_size: Amount,
    pub probe_amount: Amount,
    pub transfer_timeout: Duration,
    pub min_backoff: Duration,
    pub regression_policy: RegressionPolicy,
    /// Abort after this many rejected attempts in a row. `None` retries forever.
    pub max_consecutive_rejections: Option<u32>,
    /// Abort once a payment has been running this long. `None` never gives up.
    pub max_duration: Option<Duration>,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            initial_chunk_size: Amount::from(DEFAULT_CHUNK_SIZE),
            probe_amount: Amount::from(DEFAULT_PROBE_AMOUNT),
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            min_backoff: DEFAULT_MIN_BACKOFF,
            regression_policy: RegressionPolicy::default(),
            max_consecutive_rejections: None,
            max_duration: None,
        }
    }
}

impl PaymentConfig {
    pub fn with_initial_chunk_size(mut self, size: Amount) -> Self {
        self.initial_chunk_size = size.max(Amount::ONE);
        self
    }

    pub fn with_probe_amount(mut self, amount: Amount) -> Self {
        self.probe_amount = amount.max(Amount::ONE);
        self
    }

    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn with_min_backoff(mut self, backoff: Duration) -> Self {
        self.min_backoff = backoff;
        self
    }

    pub fn with_regression_policy(mut self, policy: RegressionPolicy) -> Self {
        self.regression_policy = policy;
        self
    }

    pub fn with_max_consecutive_rejections(mut self, limit: Option<u32>) -> Self {
        self.max_consecutive_rejections = limit;
        self
    }

    pub fn with_max_duration(mut self, limit: Option<Duration>) -> Self {
        self.max_duration = limit;
        self
    }
}
