//! Concrete collaborators: packet encryption, commitments and an in-process path.

pub mod codec;
pub mod commitment;
pub mod loopback;
