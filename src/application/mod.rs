//! Application layer containing the sender's payment logic.
//!
//! This module defines the `PaymentEngine`, the entry point for quotes and
//! chunked payments. Each call drives its own `PaymentSession` through the
//! chunk loop, with the `Correlator` applying receiver acknowledgments.

pub mod correlator;
pub mod engine;
pub mod request;
pub mod session;
