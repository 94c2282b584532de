//! Byte-distribution entropy.
//!
//! Section entropy feeds the packer heuristic and the model features, so
//! both go through the same [`shannon_entropy`] implementation.

pub mod core;

pub use self::core::{round2, rounded_entropy, shannon_entropy};
