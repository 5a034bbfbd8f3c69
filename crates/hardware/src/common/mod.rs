//! Common types shared across the simulator.
//!
//! 1. **Constants:** the fixed memory map and interrupt delegation bit positions.
//! 2. **Error handling:** the `Trap` taxonomy and host-boundary `HostError`.

/// Memory map and delegation bit-position constants.
pub mod constants;

/// Trap and host error types.
pub mod error;

pub use error::{HostError, Trap};
