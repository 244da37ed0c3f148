use crate::domain::amount::Amount;
use crate::domain::packet::SharedSecret;
use crate::error::{PaymentError, Result};
use serde::Serialize;

/// The known side of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteAmount {
    Source(Amount),
    Destination(Amount),
}

#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub amount: QuoteAmount,
    pub shared_secret: SharedSecret,
    pub destination_account: String,
}

impl QuoteRequest {
    /// Builds a request from optional amounts, exactly one of which must be set.
    pub fn from_amounts(
        source_amount: Option<Amount>,
        destination_amount: Option<Amount>,
        shared_secret: SharedSecret,
        destination_account: impl Into<String>,
    ) -> Result<Self> {
        let amount = match (source_amount, destination_amount) {
            (Some(source), None) => QuoteAmount::Source(source),
            (None, Some(destination)) => QuoteAmount::Destination(destination),
            (Some(_), Some(_)) => {
                return Err(PaymentError::Precondition(
                    "provide either a source or a destination amount, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(PaymentError::Precondition(
                    "either a source or a destination amount is required".to_string(),
                ));
            }
        };
        Ok(Self {
            amount,
            shared_secret,
            destination_account: destination_account.into(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SendRequest {
    pub source_amount: Amount,
    pub shared_secret: SharedSecret,
    pub destination_account: String,
}

#[derive(Debug, Clone)]
pub struct DeliverRequest {
    pub destination_amount: Amount,
    pub shared_secret: SharedSecret,
    pub destination_account: String,
}

/// Outcome of a quote: the side that was not given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Quote {
    SourceAmount(Amount),
    DestinationAmount(Amount),
}

/// What a payment actually moved. Also reported as partial progress on abort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub source_amount: Amount,
    pub destination_amount: Amount,
    pub num_chunks: u64,
}

/// Payment amounts must be positive whole units.
pub(crate) fn check_amount(name: &str, amount: Amount) -> Result<()> {
    if amount.is_zero() {
        return Err(PaymentError::Precondition(format!("{name} must be positive")));
    }
    if amount != amount.floor() {
        return Err(PaymentError::Precondition(format!(
            "{name} must be a whole number of units, got {amount}"
        )));
    }
    Ok(())
}

pub(crate) fn check_destination(destination_account: &str) -> Result<()> {
    if destination_account.trim().is_empty() {
        return Err(PaymentError::Precondition(
            "destination account is required".to_string(),
        ));
    }
    Ok(())
}
