//! Sender side of chunked conditional payments.
//!
//! A payment is split into many small conditional transfers whose size adapts
//! to path feedback: chunks grow after every fulfillment and shrink with a
//! backoff after temporary rejections. Each transfer carries an encrypted packet
//! for the receiver and is locked to a condition derived from that packet, so
//! only the receiver holding the shared secret can claim it.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod logging;

pub use application::engine::PaymentEngine;
pub use application::request::{
    DeliverRequest, PaymentReceipt, Quote, QuoteAmount, QuoteRequest, SendRequest,
};
pub use config::{PaymentConfig, RegressionPolicy};
pub use domain::amount::Amount;
pub use domain::packet::SharedSecret;
pub use error::{PaymentError, Result, TransportError};
