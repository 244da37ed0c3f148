use crate::application::request::PaymentReceipt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Failure reported by a [`Transport`](crate::domain::ports::Transport) that is
/// not a structured rejection from the path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("transport is disconnected")]
    Disconnected,
    #[error("transport error: {0}")]
    Other(String),
}

/// Failure while encoding or decoding an encrypted packet.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("decryption failed: wrong key or corrupted ciphertext")]
    Decrypt,
    #[error("encryption failed")]
    Encrypt,
    #[error("malformed packet: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("invalid request: {0}")]
    Precondition(String),
    #[error("bad response from receiver: {0}")]
    BadResponse(String),
    #[error("transfer rejected with final error {code}: {message}")]
    Rejected { code: String, message: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("packet encoding failed: {0}")]
    Codec(#[from] CodecError),
    #[error("quote probe was unexpectedly fulfilled")]
    UnexpectedFulfillment,
    #[error("fulfillment does not match the transfer condition")]
    FulfillmentMismatch,
    #[error("exchange rate to the receiver is zero")]
    ZeroRate,
    #[error("gave up after {attempts} consecutive rejected attempts")]
    RetryLimitExceeded { attempts: u32 },
    #[error("gave up after {elapsed:?} without completing the payment")]
    DeadlineExceeded { elapsed: Duration },
    #[error(
        "payment aborted after {} chunks (sent {}, delivered {}): {source}",
        .progress.num_chunks,
        .progress.source_amount,
        .progress.destination_amount
    )]
    Aborted {
        progress: PaymentReceipt,
        #[source]
        source: Box<PaymentError>,
    },
}

impl PaymentError {
    /// The underlying error, looking through [`PaymentError::Aborted`].
    pub fn root(&self) -> &PaymentError {
        match self {
            PaymentError::Aborted { source, .. } => source.root(),
            other => other,
        }
    }

    /// Partial progress recorded when a payment was aborted mid-flight.
    pub fn progress(&self) -> Option<&PaymentReceipt> {
        match self {
            PaymentError::Aborted { progress, .. } => Some(progress),
            _ => None,
        }
    }
}
