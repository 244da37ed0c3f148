use super::correlator::Correlator;
use super::request::{
    DeliverRequest, PaymentReceipt, Quote, QuoteAmount, QuoteRequest, SendRequest, check_amount,
    check_destination,
};
use super::session::{PaymentSession, Target};
use crate::config::PaymentConfig;
use crate::domain::amount::Amount;
use crate::domain::packet::{Packet, PacketType, PaymentId, SharedSecret};
use crate::domain::ports::{CommitmentDeriverBox, PacketCodecBox, TransportBox};
use crate::domain::transfer::{Condition, RejectionClass, Transfer, TransferReply};
use crate::error::{PaymentError, Result};
use crate::infrastructure::codec::AesGcmPacketCodec;
use crate::infrastructure::commitment::HmacCommitments;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Sender side of chunked conditional payments.
///
/// `PaymentEngine` owns the transport and the packet/commitment collaborators.
/// Every call to [`quote`](Self::quote), [`send`](Self::send) or
/// [`deliver`](Self::deliver) runs its own [`PaymentSession`]; nothing is shared
/// between calls, so independent payments can run concurrently on one engine.
pub struct PaymentEngine {
    transport: TransportBox,
    codec: PacketCodecBox,
    commitments: CommitmentDeriverBox,
    config: PaymentConfig,
}

impl PaymentEngine {
    /// Creates an engine using AES-GCM packets and HMAC-SHA256 commitments.
    pub fn new(transport: TransportBox) -> Self {
        Self {
            transport,
            codec: Box::new(AesGcmPacketCodec::new()),
            commitments: Box::new(HmacCommitments::new()),
            config: PaymentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PaymentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_codec(mut self, codec: PacketCodecBox) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_commitments(mut self, commitments: CommitmentDeriverBox) -> Self {
        self.commitments = commitments;
        self
    }

    /// Estimates the other side of a payment with a single probe.
    ///
    /// The probe is a last chunk demanding the maximum amount and locked to a
    /// random condition, so the receiver always rejects it while reporting how
    /// much the probe would have delivered.
    pub async fn quote(&self, request: QuoteRequest) -> Result<Quote> {
        let probe_amount = match request.amount {
            QuoteAmount::Source(amount) => {
                check_amount("source amount", amount)?;
                amount
            }
            QuoteAmount::Destination(amount) => {
                check_amount("destination amount", amount)?;
                self.config.probe_amount
            }
        };
        check_destination(&request.destination_account)?;

        let secret = &request.shared_secret;
        let payment_id = PaymentId::random();
        let packet = Packet {
            packet_type: PacketType::LastChunk,
            payment_id,
            sequence: 0,
            payment_amount: Amount::max_wire(),
            chunk_amount: Amount::max_wire(),
        };
        let transfer = Transfer {
            amount: probe_amount,
            destination: request.destination_account.clone(),
            execution_condition: Condition::random(),
            expires_at: self.expiry(),
            data: self.codec.encode(secret, &packet)?,
        };

        debug!(%payment_id, amount = %probe_amount, "sending quote probe");
        let rejection = match self.transport.send_transfer(transfer).await? {
            TransferReply::Fulfilled { .. } => return Err(PaymentError::UnexpectedFulfillment),
            TransferReply::Rejected(rejection) => rejection,
        };

        let correlator = Correlator::new(&*self.codec, secret, self.config.regression_policy);
        let response = correlator
            .validate(payment_id, &rejection.data, PacketType::Error, 0)
            .map_err(|err| {
                debug!(%payment_id, code = %rejection.code, error = %err, "unusable quote response");
                PaymentError::Rejected {
                    code: rejection.code.clone(),
                    message: rejection.message.clone(),
                }
            })?;
        let amount_received = response.chunk_amount;

        let quote = match request.amount {
            QuoteAmount::Source(_) => Quote::DestinationAmount(amount_received),
            QuoteAmount::Destination(destination_amount) => {
                if amount_received.is_zero() {
                    return Err(PaymentError::ZeroRate);
                }
                let source = destination_amount
                    .value()
                    .checked_mul(probe_amount.value())
                    .and_then(|v| v.checked_div(amount_received.value()))
                    .ok_or_else(|| {
                        PaymentError::Precondition("quoted amount is out of range".to_string())
                    })?;
                Quote::SourceAmount(Amount::new(source)?.floor())
            }
        };
        info!(%payment_id, probe = %probe_amount, received = %amount_received, ?quote, "quote complete");
        Ok(quote)
    }

    /// Sends exactly `source_amount`, in chunks, and reports what was delivered.
    pub async fn send(&self, request: SendRequest) -> Result<PaymentReceipt> {
        check_amount("source amount", request.source_amount)?;
        check_destination(&request.destination_account)?;
        self.pay(
            Target::FixedSource(request.source_amount),
            &request.shared_secret,
            &request.destination_account,
        )
        .await
    }

    /// Delivers at least `destination_amount`, in chunks, and reports what it cost.
    pub async fn deliver(&self, request: DeliverRequest) -> Result<PaymentReceipt> {
        check_amount("destination amount", request.destination_amount)?;
        check_destination(&request.destination_account)?;
        self.pay(
            Target::FixedDestination(request.destination_amount),
            &request.shared_secret,
            &request.destination_account,
        )
        .await
    }

    async fn pay(
        &self,
        target: Target,
        secret: &SharedSecret,
        destination: &str,
    ) -> Result<PaymentReceipt> {
        let mut session = PaymentSession::new(PaymentId::random(), self.config.initial_chunk_size);
        info!(payment_id = %session.payment_id, ?target, %destination, "starting payment");

        match self.run(&mut session, target, secret, destination).await {
            Ok(()) => {
                let receipt = session.receipt();
                info!(
                    payment_id = %session.payment_id,
                    sent = %receipt.source_amount,
                    delivered = %receipt.destination_amount,
                    chunks = receipt.num_chunks,
                    "payment complete"
                );
                Ok(receipt)
            }
            Err(source) => {
                warn!(payment_id = %session.payment_id, error = %source, "payment aborted");
                Err(PaymentError::Aborted {
                    progress: session.receipt(),
                    source: Box::new(source),
                })
            }
        }
    }

    async fn run(
        &self,
        session: &mut PaymentSession,
        target: Target,
        secret: &SharedSecret,
        destination: &str,
    ) -> Result<()> {
        let correlator = Correlator::new(&*self.codec, secret, self.config.regression_policy);
        let started = Instant::now();
        let deadline = self.config.max_duration.map(|limit| started + limit);

        loop {
            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                return Err(PaymentError::DeadlineExceeded {
                    elapsed: started.elapsed(),
                });
            }

            let Some(chunk_amount) = session.next_chunk(target) else {
                return Ok(());
            };
            let sequence = session.sequence;

            let packet = Packet {
                packet_type: if session.last_chunk {
                    PacketType::LastChunk
                } else {
                    PacketType::Chunk
                },
                payment_id: session.payment_id,
                sequence,
                payment_amount: match target {
                    Target::FixedDestination(destination_amount) => destination_amount,
                    Target::FixedSource(_) => Amount::max_wire(),
                },
                chunk_amount: session.minimum_to_accept(),
            };
            let data = self.codec.encode(secret, &packet)?;
            let fulfillment = self.commitments.fulfillment(secret, &data);
            let condition = self.commitments.condition(&fulfillment);

            debug!(
                payment_id = %session.payment_id,
                sequence,
                amount = %chunk_amount,
                minimum = %packet.chunk_amount,
                last_chunk = session.last_chunk,
                "sending chunk"
            );
            let pending = self.transport.send_transfer(Transfer {
                amount: chunk_amount,
                destination: destination.to_string(),
                execution_condition: condition,
                expires_at: self.expiry(),
                data,
            });
            let reply = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, pending)
                    .await
                    .map_err(|_| PaymentError::DeadlineExceeded {
                        elapsed: started.elapsed(),
                    })??,
                None => pending.await?,
            };

            match reply {
                TransferReply::Fulfilled { fulfillment, data } => {
                    if self.commitments.condition(&fulfillment) != condition {
                        return Err(PaymentError::FulfillmentMismatch);
                    }
                    session.record_fulfilled(chunk_amount);
                    correlator.apply(session, &data, PacketType::Fulfillment, sequence)?;
                    debug!(
                        payment_id = %session.payment_id,
                        sequence = session.sequence,
                        sent = %session.amount_sent,
                        delivered = %session.amount_delivered,
                        "chunk fulfilled"
                    );
                    if session.last_chunk && matches!(target, Target::FixedSource(_)) {
                        return Ok(());
                    }
                    session.sequence += 1;
                }
                TransferReply::Rejected(rejection) => match rejection.class() {
                    RejectionClass::Application => {
                        correlator.apply(session, &rejection.data, PacketType::Error, sequence)?;
                        session.record_application_rejection();
                        debug!(
                            payment_id = %session.payment_id,
                            sequence = session.sequence,
                            message = %rejection.message,
                            "receiver rejected chunk"
                        );
                        self.check_rejection_limit(session)?;
                    }
                    RejectionClass::Retryable => {
                        let wait = session.record_retryable(self.config.min_backoff);
                        warn!(
                            payment_id = %session.payment_id,
                            code = %rejection.code,
                            message = %rejection.message,
                            next_chunk = %session.chunk_size,
                            wait_ms = wait.as_millis() as u64,
                            "temporary rejection, backing off"
                        );
                        self.check_rejection_limit(session)?;
                        let wake = Instant::now() + wait;
                        tokio::time::sleep_until(deadline.map_or(wake, |d| wake.min(d))).await;
                    }
                    RejectionClass::Final => {
                        return Err(PaymentError::Rejected {
                            code: rejection.code,
                            message: rejection.message,
                        });
                    }
                },
            }
        }
    }

    fn check_rejection_limit(&self, session: &PaymentSession) -> Result<()> {
        match self.config.max_consecutive_rejections {
            Some(limit) if session.consecutive_rejections >= limit => {
                Err(PaymentError::RetryLimitExceeded {
                    attempts: session.consecutive_rejections,
                })
            }
            _ => Ok(()),
        }
    }

    fn expiry(&self) -> DateTime<Utc> {
        let now = Utc::now();
        TimeDelta::from_std(self.config.transfer_timeout)
            .ok()
            .and_then(|timeout| now.checked_add_signed(timeout))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
