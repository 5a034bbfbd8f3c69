//! Device trait for memory-mapped I/O.
//!
//! Every bus-attached component exposes a uniform, size-parameterized,
//! fallible load/store contract. Unlike an infallible `Device` that defaults
//! to zero on a miss, every implementor here reports the exact fault kind
//! the bus is required to surface to the hart.

use crate::common::error::Trap;

/// A component attached to the system bus at a fixed address range.
pub trait Device: Send + Sync {
    /// Short name for diagnostics (e.g. `"DRAM"`, `"UART0"`).
    fn name(&self) -> &str;

    /// `(base, size)` of this device's region in the bus address space.
    fn address_range(&self) -> (u64, u64);

    /// Reads `size` bits (8/16/32/64) at `offset`, relative to this device's base.
    ///
    /// # Errors
    /// Returns `Trap::LoadAccessFault` for an unsupported size or an
    /// out-of-range offset.
    fn load(&mut self, offset: u64, size: u32) -> Result<u64, Trap>;

    /// Writes the low `size` bits of `value` at `offset`, relative to this device's base.
    ///
    /// # Errors
    /// Returns `Trap::StoreAmoAccessFault` for an unsupported size or an
    /// out-of-range offset.
    fn store(&mut self, offset: u64, size: u32, value: u64) -> Result<(), Trap>;

    /// Copies an image into the device starting at `offset` (used to load the boot binary).
    ///
    /// # Errors
    /// Returns `Trap::StoreAmoAccessFault` if the image does not fit.
    fn load_image(&mut self, offset: u64, data: &[u8]) -> Result<(), Trap> {
        for (i, byte) in data.iter().enumerate() {
            self.store(offset + i as u64, 8, u64::from(*byte))?;
        }
        Ok(())
    }
}
