use crate::error::PaymentError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// A non-negative quantity of asset units.
///
/// This is a wrapper around `rust_decimal::Decimal` so that accounting never goes
/// through floating point. Intermediate values (rates, products) may carry a
/// fractional part; the explicit rounding helpers bring them back to whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    /// Largest amount representable on the wire, also used as the
    /// "unknown / maximum" sentinel in packets.
    pub const MAX_WIRE: u64 = u64::MAX;

    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(PaymentError::Precondition(
                "amount must not be negative".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// The sentinel maximum, i.e. `MAX_WIRE` units.
    pub fn max_wire() -> Self {
        Self(Decimal::from(Self::MAX_WIRE))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtraction that stops at zero instead of going negative.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        if rhs.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - rhs.0)
        }
    }

    /// Multiplies by `factor` and rounds to the nearest unit, midpoints away from zero.
    pub fn scale_rounded(self, factor: Decimal) -> Self {
        Self(round_half_up(self.0 * factor))
    }

    /// Multiplies by `factor` and rounds down to a whole unit.
    pub fn scale_floor(self, factor: Decimal) -> Self {
        Self((self.0 * factor).floor())
    }

    pub fn floor(self) -> Self {
        Self(self.0.floor())
    }

    /// Whole units for the wire format, floored and clamped to `MAX_WIRE`.
    pub fn to_wire(self) -> u64 {
        self.0.floor().to_u64().unwrap_or(Self::MAX_WIRE)
    }

    pub fn from_wire(units: u64) -> Self {
        Self(Decimal::from(units))
    }
}

/// Rounds to the nearest integer, with midpoints going away from zero.
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Ratio `numerator / denominator`, or `None` when the denominator is zero.
pub fn ratio(numerator: Amount, denominator: Amount) -> Option<Decimal> {
    numerator.0.checked_div(denominator.0)
}

/// Whole units needed to deliver `target` at `rate`, rounded up.
///
/// Returns `None` when the rate is zero, i.e. no amount would be enough.
pub fn units_to_deliver(target: Amount, rate: Decimal) -> Option<Amount> {
    if rate.is_zero() {
        return None;
    }
    target.0.checked_div(rate).map(|v| Amount(v.ceil()))
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Self(Decimal::from(units))
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| PaymentError::Precondition(format!("invalid amount {s:?}: {e}")))?;
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}
