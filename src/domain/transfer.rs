use crate::config::{APPLICATION_REJECTION_CODE, RETRYABLE_CODE_PREFIXES};
use crate::domain::amount::Amount;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Proof that unlocks a conditional transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fulfillment(pub [u8; 32]);

/// Commitment a transfer is locked to: the SHA-256 digest of its fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition(pub [u8; 32]);

impl Fulfillment {
    pub fn condition(&self) -> Condition {
        Condition(Sha256::digest(self.0).into())
    }

    pub fn matches(&self, condition: &Condition) -> bool {
        self.condition() == *condition
    }
}

impl Condition {
    /// A condition nobody knows the preimage of, for probes that must never settle.
    pub fn random() -> Self {
        Condition(rand::random())
    }
}

/// A conditional transfer handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub amount: Amount,
    pub destination: String,
    pub execution_condition: Condition,
    pub expires_at: DateTime<Utc>,
    /// Encrypted application packet for the receiver.
    pub data: Vec<u8>,
}

/// Structured rejection of a transfer, from the network or the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub code: String,
    pub message: String,
    pub data: Vec<u8>,
}

impl Rejection {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn class(&self) -> RejectionClass {
        if self.code == APPLICATION_REJECTION_CODE {
            RejectionClass::Application
        } else if RETRYABLE_CODE_PREFIXES
            .iter()
            .any(|prefix| self.code.starts_with(*prefix))
        {
            RejectionClass::Retryable
        } else {
            RejectionClass::Final
        }
    }
}

/// How the sender reacts to a rejection code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionClass {
    /// The receiver rejected the chunk and attached an encrypted response.
    Application,
    /// Temporary or relative path error: shrink and back off.
    Retryable,
    /// Anything else aborts the payment.
    Final,
}

/// What came back for a submitted transfer.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferReply {
    Fulfilled {
        fulfillment: Fulfillment,
        data: Vec<u8>,
    },
    Rejected(Rejection),
}
