//! # Adapters

pub mod clock;

pub use clock::SystemClock;
