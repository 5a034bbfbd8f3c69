//! Platform-Level Interrupt Controller: the four S-mode registers this core recognizes.
//!
//! A real PLIC exposes per-source priority words, a pending bitmap, per-context
//! enable bitmaps, and per-context threshold/claim pairs across a sparse
//! megabyte-scale window. This core collapses that to exactly the four
//! registers software actually needs to route the UART IRQ to S-mode:
//! pending, supervisor-enable, supervisor-priority (threshold), supervisor-claim.

use tracing::info;

use crate::common::constants::{PLIC_BASE, PLIC_SIZE, UART_IRQ};
use crate::common::error::Trap;
use crate::soc::traits::Device;

const PENDING_OFFSET: u64 = 0x1000;
const SENABLE_OFFSET: u64 = 0x2000;
const SPRIORITY_OFFSET: u64 = 0x20_0000;
const SCLAIM_OFFSET: u64 = 0x20_0004;

/// The simplified interrupt controller.
#[derive(Debug)]
pub struct Plic {
    pending: u32,
    senable: u32,
    spriority: u32,
}

impl Plic {
    /// Creates a PLIC with every register at zero (no source enabled, nothing pending).
    #[must_use]
    pub fn new() -> Self {
        info!(base = format!("{PLIC_BASE:#x}"), "PLIC attached");
        Self {
            pending: 0,
            senable: 0,
            spriority: 0,
        }
    }

    /// Marks `irq` pending, for the bus to call when a device raises its line.
    pub fn set_pending(&mut self, irq: u32, pending: bool) {
        let bit = 1 << irq;
        if pending {
            self.pending |= bit;
        } else {
            self.pending &= !bit;
        }
    }

    /// Whether any enabled source above the current threshold is pending.
    #[must_use]
    pub fn is_claimable(&self) -> bool {
        (self.pending & self.senable) != 0 && self.spriority == 0
    }
}

impl Default for Plic {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Plic {
    fn name(&self) -> &str {
        "PLIC"
    }

    fn address_range(&self) -> (u64, u64) {
        (PLIC_BASE, PLIC_SIZE)
    }

    fn load(&mut self, offset: u64, size: u32) -> Result<u64, Trap> {
        let fault_addr = PLIC_BASE + offset;
        if size != 32 {
            return Err(Trap::LoadAccessFault(fault_addr));
        }
        let value = match offset {
            PENDING_OFFSET => self.pending,
            SENABLE_OFFSET => self.senable,
            SPRIORITY_OFFSET => self.spriority,
            SCLAIM_OFFSET => {
                if self.is_claimable() {
                    UART_IRQ
                } else {
                    0
                }
            }
            _ => 0,
        };
        Ok(u64::from(value))
    }

    fn store(&mut self, offset: u64, size: u32, value: u64) -> Result<(), Trap> {
        let fault_addr = PLIC_BASE + offset;
        if size != 32 {
            return Err(Trap::StoreAmoAccessFault(fault_addr));
        }
        let value = value as u32;
        match offset {
            PENDING_OFFSET => self.pending = value,
            SENABLE_OFFSET => self.senable = value,
            SPRIORITY_OFFSET => self.spriority = value,
            SCLAIM_OFFSET => {
                if value == UART_IRQ {
                    self.set_pending(UART_IRQ, false);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_returns_uart_irq_when_pending_and_enabled() {
        let mut plic = Plic::new();
        plic.store(SENABLE_OFFSET, 32, 1 << UART_IRQ).unwrap();
        plic.set_pending(UART_IRQ, true);
        assert_eq!(plic.load(SCLAIM_OFFSET, 32).unwrap(), u64::from(UART_IRQ));
    }

    #[test]
    fn complete_clears_pending() {
        let mut plic = Plic::new();
        plic.store(SENABLE_OFFSET, 32, 1 << UART_IRQ).unwrap();
        plic.set_pending(UART_IRQ, true);
        plic.store(SCLAIM_OFFSET, 32, u64::from(UART_IRQ)).unwrap();
        assert_eq!(plic.load(SCLAIM_OFFSET, 32).unwrap(), 0);
    }

    #[test]
    fn unrecognized_in_range_address_reads_zero() {
        let mut plic = Plic::new();
        assert_eq!(plic.load(0x5000, 32).unwrap(), 0);
    }

    #[test]
    fn non_32_bit_access_faults() {
        let mut plic = Plic::new();
        assert!(matches!(
            plic.load(PENDING_OFFSET, 64),
            Err(Trap::LoadAccessFault(_))
        ));
    }
}
