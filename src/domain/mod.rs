//! Domain types and the ports the payment engine talks through.

pub mod amount;
pub mod packet;
pub mod ports;
pub mod transfer;
