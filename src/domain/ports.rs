use super::packet::{Packet, SharedSecret};
use super::transfer::{Condition, Fulfillment, Transfer, TransferReply};
use crate::error::{CodecError, TransportError};
use async_trait::async_trait;

/// Moves a conditional transfer across the network and reports its outcome.
///
/// Rejections are part of the normal reply; `Err` is reserved for failures of
/// the transport itself.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_transfer(&self, transfer: Transfer) -> Result<TransferReply, TransportError>;
}

/// Encrypts and decrypts application packets under the shared secret.
pub trait PacketCodec: Send + Sync {
    fn encode(&self, secret: &SharedSecret, packet: &Packet) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, secret: &SharedSecret, bytes: &[u8]) -> Result<Packet, CodecError>;
}

/// Derives the fulfillment for a packet and the condition for a fulfillment.
pub trait CommitmentDeriver: Send + Sync {
    fn fulfillment(&self, secret: &SharedSecret, packet_bytes: &[u8]) -> Fulfillment;

    fn condition(&self, fulfillment: &Fulfillment) -> Condition {
        fulfillment.condition()
    }
}

pub type TransportBox = Box<dyn Transport>;
pub type PacketCodecBox = Box<dyn PacketCodec>;
pub type CommitmentDeriverBox = Box<dyn CommitmentDeriver>;

