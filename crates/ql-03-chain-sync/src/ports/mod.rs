//! # Ports Module
//!
//! What the sync engine offers (inbound) and what it needs (outbound).

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
