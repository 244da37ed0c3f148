use crate::domain::amount::Amount;
use crate::domain::packet::{Packet, PacketType, PaymentId, SharedSecret};
use crate::domain::ports::{CommitmentDeriver, PacketCodec, Transport};
use crate::domain::transfer::{Rejection, Transfer, TransferReply};
use crate::error::TransportError;
use crate::infrastructure::codec::AesGcmPacketCodec;
use crate::infrastructure::commitment::HmacCommitments;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// An in-process path and receiver.
///
/// Applies a fixed exchange rate to every transfer, optionally caps the amount a
/// single transfer may carry, and plays the receiver side of the chunk protocol:
/// it fulfills a chunk when it delivers at least the requested minimum and
/// answers with encrypted acknowledgments either way.
///
/// Cloning shares the receiver's state, which makes it handy for inspecting
/// totals after a payment in tests.
#[derive(Clone)]
pub struct LoopbackTransport {
    secret: SharedSecret,
    rate: Decimal,
    max_packet_amount: Option<Amount>,
    codec: AesGcmPacketCodec,
    commitments: HmacCommitments,
    received: Arc<RwLock<HashMap<PaymentId, Amount>>>,
}

impl LoopbackTransport {
    pub fn new(secret: SharedSecret, rate: Decimal) -> Self {
        Self {
            secret,
            rate,
            max_packet_amount: None,
            codec: AesGcmPacketCodec::new(),
            commitments: HmacCommitments::new(),
            received: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Transfers above `limit` are rejected with `T04` before reaching the receiver.
    pub fn with_max_packet_amount(mut self, limit: Amount) -> Self {
        self.max_packet_amount = Some(limit);
        self
    }

    /// Total the receiver has accepted for a payment.
    pub async fn received(&self, payment_id: &PaymentId) -> Amount {
        let received = self.received.read().await;
        received.get(payment_id).copied().unwrap_or(Amount::ZERO)
    }

    fn reply_packet(
        &self,
        packet_type: PacketType,
        request: &Packet,
        total: Amount,
        chunk: Amount,
    ) -> Result<Vec<u8>, TransportError> {
        let packet = Packet {
            packet_type,
            payment_id: request.payment_id,
            sequence: request.sequence,
            payment_amount: total,
            chunk_amount: chunk,
        };
        self.codec
            .encode(&self.secret, &packet)
            .map_err(|e| TransportError::Other(e.to_string()))
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send_transfer(&self, transfer: Transfer) -> Result<TransferReply, TransportError> {
        if let Some(limit) = self.max_packet_amount
            && transfer.amount > limit
        {
            return Ok(TransferReply::Rejected(Rejection::new(
                "T04",
                format!("transfer of {} exceeds maximum of {limit}", transfer.amount),
            )));
        }

        let Ok(request) = self.codec.decode(&self.secret, &transfer.data) else {
            return Ok(TransferReply::Rejected(Rejection::new(
                "F06",
                "unable to decrypt payment packet",
            )));
        };

        let chunk = transfer.amount.scale_floor(self.rate);
        let mut received = self.received.write().await;
        let total = received
            .get(&request.payment_id)
            .copied()
            .unwrap_or(Amount::ZERO);

        let accept = matches!(request.packet_type, PacketType::Chunk | PacketType::LastChunk)
            && chunk >= request.chunk_amount;
        if !accept {
            debug!(
                payment_id = %request.payment_id,
                sequence = request.sequence,
                delivered = %chunk,
                minimum = %request.chunk_amount,
                "receiver rejecting chunk"
            );
            let data = self.reply_packet(PacketType::Error, &request, total, chunk)?;
            return Ok(TransferReply::Rejected(
                Rejection::new("F99", "chunk does not meet the requested minimum").with_data(data),
            ));
        }

        let fulfillment = self.commitments.fulfillment(&self.secret, &transfer.data);
        if !fulfillment.matches(&transfer.execution_condition) {
            return Ok(TransferReply::Rejected(Rejection::new(
                "F05",
                "condition does not match the packet",
            )));
        }

        let total = total + chunk;
        received.insert(request.payment_id, total);
        let data = self.reply_packet(PacketType::Fulfillment, &request, total, chunk)?;
        Ok(TransferReply::Fulfilled { fulfillment, data })
    }
}
