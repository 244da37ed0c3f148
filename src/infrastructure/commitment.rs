use super::codec::derive_key;
use crate::domain::packet::SharedSecret;
use crate::domain::ports::CommitmentDeriver;
use crate::domain::transfer::Fulfillment;
use hmac::{Hmac, Mac};
use sha2::Sha256;

const FULFILLMENT_KEY_LABEL: &[u8] = b"chunkpay fulfillment";

/// Fulfillment = HMAC-SHA256(HMAC-SHA256(secret, label), packet bytes);
/// condition = SHA-256(fulfillment).
///
/// Only a holder of the shared secret can produce the fulfillment, and it is
/// bound to the exact sealed packet carried by the transfer.
#[derive(Debug, Default, Clone, Copy)]
pub struct HmacCommitments;

impl HmacCommitments {
    pub fn new() -> Self {
        Self
    }
}

impl CommitmentDeriver for HmacCommitments {
    fn fulfillment(&self, secret: &SharedSecret, packet_bytes: &[u8]) -> Fulfillment {
        let key = derive_key(secret, FULFILLMENT_KEY_LABEL);
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&key)
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
        mac.update(packet_bytes);
        Fulfillment(mac.finalize().into_bytes().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fulfillment_is_deterministic() {
        let secret = SharedSecret::new(vec![5u8; 32]).unwrap();
        let deriver = HmacCommitments::new();
        assert_eq!(
            deriver.fulfillment(&secret, b"packet"),
            deriver.fulfillment(&secret, b"packet")
        );
    }

    #[test]
    fn test_fulfillment_binds_secret_and_packet() {
        let secret = SharedSecret::new(vec![5u8; 32]).unwrap();
        let other = SharedSecret::new(vec![6u8; 32]).unwrap();
        let deriver = HmacCommitments::new();
        let base = deriver.fulfillment(&secret, b"packet");
        assert_ne!(base, deriver.fulfillment(&secret, b"packeT"));
        assert_ne!(base, deriver.fulfillment(&other, b"packet"));
    }

    #[test]
    fn test_condition_is_hash_of_fulfillment() {
        let secret = SharedSecret::new(vec![5u8; 32]).unwrap();
        let deriver = HmacCommitments::new();
        let fulfillment = deriver.fulfillment(&secret, b"packet");
        assert!(fulfillment.matches(&deriver.condition(&fulfillment)));
    }
}
