use crate::domain::amount::Amount;
use crate::error::{CodecError, PaymentError};
use rand::RngCore;
use std::fmt;

/// Minimum length of a shared secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Kind of an application-layer packet exchanged between sender and receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Chunk,
    LastChunk,
    Fulfillment,
    Error,
}

impl PacketType {
    pub fn to_byte(self) -> u8 {
        match self {
            PacketType::Chunk => 0,
            PacketType::LastChunk => 1,
            PacketType::Fulfillment => 2,
            PacketType::Error => 3,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            0 => Ok(PacketType::Chunk),
            1 => Ok(PacketType::LastChunk),
            2 => Ok(PacketType::Fulfillment),
            3 => Ok(PacketType::Error),
            other => Err(CodecError::Malformed(format!("unknown packet type {other}"))),
        }
    }
}

/// Random identifier binding every chunk of one payment together.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaymentId(pub [u8; 16]);

impl PaymentId {
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl fmt::Debug for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentId({})", hex::encode(self.0))
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Logical content of an application-layer packet.
///
/// Amounts are in whole units. In requests `payment_amount` is the total the
/// sender wants delivered (or [`Amount::max_wire`] when unknown) and
/// `chunk_amount` is the minimum the receiver should accept for this chunk. In
/// responses `payment_amount` is the total the receiver has received so far and
/// `chunk_amount` is what this transfer delivered (or would have delivered).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_type: PacketType,
    pub payment_id: PaymentId,
    pub sequence: u64,
    pub payment_amount: Amount,
    pub chunk_amount: Amount,
}

/// Secret shared out of band between sender and receiver. Never sent on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, PaymentError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_SECRET_LEN {
            return Err(PaymentError::Precondition(format!(
                "shared secret must be at least {MIN_SECRET_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    pub fn from_hex(encoded: &str) -> Result<Self, PaymentError> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| PaymentError::Precondition(format!("shared secret is not hex: {e}")))?;
        Self::new(bytes)
    }

    pub fn random() -> Self {
        let mut bytes = vec![0u8; MIN_SECRET_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret(<{} bytes>)", self.0.len())
    }
}
