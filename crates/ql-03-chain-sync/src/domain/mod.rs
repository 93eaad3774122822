//! # Domain Module
//!
//! Errors, the values the resolver and repairers exchange, and the
//! reports every operation produces.

pub mod errors;
pub mod invariants;
pub mod reports;
pub mod value_objects;

pub use errors::*;
pub use invariants::*;
pub use reports::*;
pub use value_objects::*;
