#![allow(dead_code)]

use async_trait::async_trait;
use chunkpay::domain::packet::{Packet, PacketType};
use chunkpay::domain::ports::{CommitmentDeriver, PacketCodec, Transport};
use chunkpay::domain::transfer::{Fulfillment, Rejection, Transfer, TransferReply};
use chunkpay::infrastructure::codec::AesGcmPacketCodec;
use chunkpay::infrastructure::commitment::HmacCommitments;
use chunkpay::{Amount, SharedSecret, TransportError};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

pub fn secret() -> SharedSecret {
    SharedSecret::new(vec![0x5au8; 32]).unwrap()
}

/// One transfer as the scripted receiver saw it.
#[derive(Debug, Clone)]
pub struct Call {
    pub index: usize,
    pub at: Instant,
    pub amount: Amount,
    pub packet: Packet,
}

/// What the scripted receiver does with a transfer.
pub enum Action {
    /// Fulfill and acknowledge with the given cumulative total.
    Fulfill { claimed_total: u64 },
    /// Fulfill with a hand-built acknowledgment packet.
    FulfillWithAck(Packet),
    /// Reject with a code and optional encrypted response.
    Reject {
        code: &'static str,
        ack: Option<Packet>,
    },
    Fail(TransportError),
    /// Never answer.
    Hang,
}

type Script = dyn Fn(&Call) -> Action + Send + Sync;

/// A receiver driven by a closure, recording every transfer it receives.
#[derive(Clone)]
pub struct ScriptedTransport {
    script: Arc<Script>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedTransport {
    pub fn new(script: impl Fn(&Call) -> Action + Send + Sync + 'static) -> Self {
        Self {
            script: Arc::new(script),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

/// Builds a response packet answering `request`.
pub fn ack(packet_type: PacketType, request: &Packet, total: u64, chunk: u64) -> Packet {
    Packet {
        packet_type,
        payment_id: request.payment_id,
        sequence: request.sequence,
        payment_amount: Amount::from(total),
        chunk_amount: Amount::from(chunk),
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_transfer(&self, transfer: Transfer) -> Result<TransferReply, TransportError> {
        let codec = AesGcmPacketCodec::new();
        let packet = codec
            .decode(&secret(), &transfer.data)
            .map_err(|e| TransportError::Other(e.to_string()))?;
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let call = Call {
                index: calls.len(),
                at: Instant::now(),
                amount: transfer.amount,
                packet: packet.clone(),
            };
            calls.push(call.clone());
            call
        };

        let seal = |p: &Packet| codec.encode(&secret(), p).unwrap();
        let fulfillment: Fulfillment = HmacCommitments::new().fulfillment(&secret(), &transfer.data);

        match (self.script)(&call) {
            Action::Fulfill { claimed_total } => Ok(TransferReply::Fulfilled {
                fulfillment,
                data: seal(&ack(
                    PacketType::Fulfillment,
                    &packet,
                    claimed_total,
                    transfer.amount.to_wire(),
                )),
            }),
            Action::FulfillWithAck(response) => Ok(TransferReply::Fulfilled {
                fulfillment,
                data: seal(&response),
            }),
            Action::Reject { code, ack } => {
                let rejection = Rejection::new(code, "scripted rejection");
                Ok(TransferReply::Rejected(match ack {
                    Some(response) => rejection.with_data(seal(&response)),
                    None => rejection,
                }))
            }
            Action::Fail(err) => Err(err),
            Action::Hang => std::future::pending().await,
        }
    }
}

/// A receiver that accepts everything at `rate` and reports running totals.
pub fn accepting_receiver(rate_num: u64, rate_den: u64) -> ScriptedTransport {
    let total = Arc::new(Mutex::new(0u64));
    ScriptedTransport::new(move |call| {
        let mut total = total.lock().unwrap();
        *total += call.amount.to_wire() * rate_num / rate_den;
        Action::Fulfill {
            claimed_total: *total,
        }
    })
}
