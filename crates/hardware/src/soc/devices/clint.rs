//! Core Local Interruptor: `mtime`/`mtimecmp`, 64-bit accesses only.

use tracing::info;

use crate::common::constants::{CLINT_BASE, CLINT_SIZE};
use crate::common::error::Trap;
use crate::soc::traits::Device;

const MTIMECMP_OFFSET: u64 = 0x4000;
const MTIME_OFFSET: u64 = 0xbff8;

/// Timer-compare device. `mtime` advances by one per retired instruction
/// (the source leaves advancement policy unspecified; this is the simplest
/// faithful model, since the timer trap test only needs `mtime >= mtimecmp`
/// to eventually hold).
#[derive(Debug)]
pub struct Clint {
    mtime: u64,
    mtimecmp: u64,
}

impl Clint {
    /// Creates a CLINT with `mtime = 0` and `mtimecmp` parked at its maximum
    /// (never fires until software programs it).
    #[must_use]
    pub fn new() -> Self {
        info!(base = format!("{CLINT_BASE:#x}"), "CLINT attached");
        Self {
            mtime: 0,
            mtimecmp: u64::MAX,
        }
    }

    /// Advances `mtime` by one tick, called once per retired instruction.
    pub fn tick(&mut self) {
        self.mtime = self.mtime.wrapping_add(1);
    }

    /// Whether the timer condition for `MIP.MTIP` currently holds.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.mtime >= self.mtimecmp
    }
}

impl Default for Clint {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Clint {
    fn name(&self) -> &str {
        "CLINT"
    }

    fn address_range(&self) -> (u64, u64) {
        (CLINT_BASE, CLINT_SIZE)
    }

    fn load(&mut self, offset: u64, size: u32) -> Result<u64, Trap> {
        let fault_addr = CLINT_BASE + offset;
        if size != 64 {
            return Err(Trap::LoadAccessFault(fault_addr));
        }
        match offset {
            MTIMECMP_OFFSET => Ok(self.mtimecmp),
            MTIME_OFFSET => Ok(self.mtime),
            _ => Err(Trap::LoadAccessFault(fault_addr)),
        }
    }

    fn store(&mut self, offset: u64, size: u32, value: u64) -> Result<(), Trap> {
        let fault_addr = CLINT_BASE + offset;
        if size != 64 {
            return Err(Trap::StoreAmoAccessFault(fault_addr));
        }
        match offset {
            MTIMECMP_OFFSET => {
                self.mtimecmp = value;
                Ok(())
            }
            MTIME_OFFSET => {
                self.mtime = value;
                Ok(())
            }
            _ => Err(Trap::StoreAmoAccessFault(fault_addr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mtimecmp_round_trips() {
        let mut clint = Clint::new();
        clint.store(MTIMECMP_OFFSET, 64, 100).unwrap();
        assert_eq!(clint.load(MTIMECMP_OFFSET, 64).unwrap(), 100);
    }

    #[test]
    fn non_64_bit_access_faults() {
        let mut clint = Clint::new();
        assert!(matches!(
            clint.load(MTIME_OFFSET, 32),
            Err(Trap::LoadAccessFault(_))
        ));
    }

    #[test]
    fn unrecognized_address_faults() {
        let mut clint = Clint::new();
        assert!(matches!(
            clint.load(0x100, 64),
            Err(Trap::LoadAccessFault(_))
        ));
    }

    #[test]
    fn timer_fires_once_mtime_reaches_mtimecmp() {
        let mut clint = Clint::new();
        clint.store(MTIMECMP_OFFSET, 64, 3).unwrap();
        for _ in 0..3 {
            assert!(!clint.is_pending());
            clint.tick();
        }
        assert!(clint.is_pending());
    }
}
