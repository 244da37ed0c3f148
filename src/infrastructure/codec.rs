//! AES-256-GCM packet codec.
//!
//! The encryption key is derived from the shared secret with HMAC-SHA256 so the
//! raw secret is never used directly as a cipher key. Sealed packets are
//! `nonce || ciphertext`, where the ciphertext includes the GCM tag.
//!
//! Plaintext layout (big endian):
//!
//! ```text
//! version u8 | type u8 | payment id [16] | sequence u64 | payment amount u64 | chunk amount u64
//! ```

use crate::domain::amount::Amount;
use crate::domain::packet::{Packet, PacketType, PaymentId, SharedSecret};
use crate::domain::ports::PacketCodec;
use crate::error::CodecError;
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

const ENCRYPTION_KEY_LABEL: &[u8] = b"chunkpay encryption";
const PACKET_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const PLAINTEXT_LEN: usize = 1 + 1 + 16 + 8 + 8 + 8;

/// Derives a 32-byte key from the shared secret for the given label.
pub(crate) fn derive_key(secret: &SharedSecret, label: &[u8]) -> [u8; 32] {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(label);
    mac.finalize().into_bytes().into()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AesGcmPacketCodec;

impl AesGcmPacketCodec {
    pub fn new() -> Self {
        Self
    }

    fn cipher(secret: &SharedSecret) -> Aes256Gcm {
        let key = derive_key(secret, ENCRYPTION_KEY_LABEL);
        Aes256Gcm::new(&key.into())
    }
}

fn serialize(packet: &Packet) -> [u8; PLAINTEXT_LEN] {
    let mut buf = [0u8; PLAINTEXT_LEN];
    buf[0] = PACKET_VERSION;
    buf[1] = packet.packet_type.to_byte();
    buf[2..18].copy_from_slice(&packet.payment_id.0);
    buf[18..26].copy_from_slice(&packet.sequence.to_be_bytes());
    buf[26..34].copy_from_slice(&packet.payment_amount.to_wire().to_be_bytes());
    buf[34..42].copy_from_slice(&packet.chunk_amount.to_wire().to_be_bytes());
    buf
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(bytes);
    u64::from_be_bytes(word)
}

fn deserialize(bytes: &[u8]) -> Result<Packet, CodecError> {
    if bytes.len() != PLAINTEXT_LEN {
        return Err(CodecError::Malformed(format!(
            "expected {PLAINTEXT_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[0] != PACKET_VERSION {
        return Err(CodecError::Malformed(format!(
            "unsupported packet version {}",
            bytes[0]
        )));
    }
    let mut payment_id = [0u8; 16];
    payment_id.copy_from_slice(&bytes[2..18]);
    Ok(Packet {
        packet_type: PacketType::from_byte(bytes[1])?,
        payment_id: PaymentId(payment_id),
        sequence: read_u64(&bytes[18..26]),
        payment_amount: Amount::from_wire(read_u64(&bytes[26..34])),
        chunk_amount: Amount::from_wire(read_u64(&bytes[34..42])),
    })
}

impl PacketCodec for AesGcmPacketCodec {
    fn encode(&self, secret: &SharedSecret, packet: &Packet) -> Result<Vec<u8>, CodecError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = Self::cipher(secret)
            .encrypt(Nonce::from_slice(&nonce_bytes), serialize(packet).as_slice())
            .map_err(|_| CodecError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decode(&self, secret: &SharedSecret, bytes: &[u8]) -> Result<Packet, CodecError> {
        if bytes.len() < NONCE_LEN {
            return Err(CodecError::Malformed("sealed packet too short".to_string()));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = Self::cipher(secret)
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CodecError::Decrypt)?;
        deserialize(&plaintext)
    }
}
