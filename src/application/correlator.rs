use super::session::PaymentSession;
use crate::config::RegressionPolicy;
use crate::domain::amount::ratio;
use crate::domain::packet::{Packet, PacketType, PaymentId, SharedSecret};
use crate::domain::ports::PacketCodec;
use crate::error::{PaymentError, Result};
use tracing::{debug, warn};

/// Binds a receiver response to the request it answers and applies it.
///
/// A response only counts if it decrypts under the shared secret and carries
/// the expected type, payment id and sequence.
pub struct Correlator<'a> {
    codec: &'a dyn PacketCodec,
    secret: &'a SharedSecret,
    policy: RegressionPolicy,
}

impl<'a> Correlator<'a> {
    pub fn new(
        codec: &'a dyn PacketCodec,
        secret: &'a SharedSecret,
        policy: RegressionPolicy,
    ) -> Self {
        Self {
            codec,
            secret,
            policy,
        }
    }

    /// Decrypts `data` and checks it answers `(payment_id, sequence)` with `expected_type`.
    pub fn validate(
        &self,
        payment_id: PaymentId,
        data: &[u8],
        expected_type: PacketType,
        expected_sequence: u64,
    ) -> Result<Packet> {
        let packet = self
            .codec
            .decode(self.secret, data)
            .map_err(|e| PaymentError::BadResponse(e.to_string()))?;

        if packet.packet_type != expected_type {
            return Err(PaymentError::BadResponse(format!(
                "expected {expected_type:?} packet, got {:?}",
                packet.packet_type
            )));
        }
        if packet.payment_id != payment_id {
            return Err(PaymentError::BadResponse(format!(
                "payment id mismatch: expected {payment_id}, got {}",
                packet.payment_id
            )));
        }
        if packet.sequence != expected_sequence {
            return Err(PaymentError::BadResponse(format!(
                "sequence mismatch: expected {expected_sequence}, got {}",
                packet.sequence
            )));
        }
        Ok(packet)
    }

    /// Validates a response and raises `amount_delivered` to the receiver's claim.
    ///
    /// Claims at or below what was already recorded leave the session untouched;
    /// a strictly lower claim is an error only under [`RegressionPolicy::Fail`].
    pub fn apply(
        &self,
        session: &mut PaymentSession,
        data: &[u8],
        expected_type: PacketType,
        expected_sequence: u64,
    ) -> Result<Packet> {
        let packet = self.validate(session.payment_id, data, expected_type, expected_sequence)?;
        let claimed = packet.payment_amount;

        if claimed > session.amount_delivered {
            session.amount_delivered = claimed;
            if let Some(rate) = ratio(session.amount_delivered, session.amount_sent) {
                session.rate = Some(rate);
            }
            debug!(
                payment_id = %session.payment_id,
                sequence = expected_sequence,
                delivered = %session.amount_delivered,
                "receiver acknowledged amount"
            );
        } else if claimed < session.amount_delivered {
            warn!(
                payment_id = %session.payment_id,
                sequence = expected_sequence,
                claimed = %claimed,
                delivered = %session.amount_delivered,
                "receiver claimed less than previously reported"
            );
            if self.policy == RegressionPolicy::Fail {
                return Err(PaymentError::BadResponse(format!(
                    "receiver claimed {claimed} after reporting {}",
                    session.amount_delivered
                )));
            }
        }
        Ok(packet)
    }
}
