//! System bus: routes a physical address to the device whose region contains it.

use tracing::warn;

use crate::common::constants::{CLINT_BASE, CLINT_SIZE, DRAM_BASE, PLIC_BASE, PLIC_SIZE, UART_BASE, UART_SIZE};
use crate::common::error::Trap;
use crate::soc::devices::{Clint, Dram, Plic, Uart};
use crate::soc::traits::Device;

/// Routes loads and stores to Dram, Clint, Plic, or Uart by address range.
///
/// The bus exclusively owns its devices; the hart never reaches inside one —
/// all device state flows through `load`/`store`.
#[derive(Debug)]
pub struct Bus {
    /// Main memory.
    pub dram: Dram,
    /// Timer-compare device.
    pub clint: Clint,
    /// Interrupt controller.
    pub plic: Plic,
    /// Serial port.
    pub uart: Uart,
}

impl Bus {
    /// Creates a bus with a fresh instance of every fixed device.
    ///
    /// `dram_size` sizes main memory; every other device's window is fixed
    /// by the memory map regardless of configuration.
    #[must_use]
    pub fn new(dram_size: u64, uart_to_stderr: bool) -> Self {
        Self {
            dram: Dram::new(dram_size),
            clint: Clint::new(),
            plic: Plic::new(),
            uart: Uart::new(uart_to_stderr),
        }
    }

    /// Reads `size` bits at `addr`, dispatching to the owning device.
    ///
    /// # Errors
    /// `Trap::LoadAccessFault(addr)` if no device's region contains `addr`, or
    /// whatever fault kind the owning device reports for an in-range miss.
    pub fn load(&mut self, addr: u64, size: u32) -> Result<u64, Trap> {
        if let Some(offset) = in_range(addr, DRAM_BASE, self.dram.address_range().1) {
            return self.dram.load(offset, size);
        }
        if let Some(offset) = in_range(addr, CLINT_BASE, CLINT_SIZE) {
            return self.clint.load(offset, size);
        }
        if let Some(offset) = in_range(addr, PLIC_BASE, PLIC_SIZE) {
            return self.plic.load(offset, size);
        }
        if let Some(offset) = in_range(addr, UART_BASE, UART_SIZE) {
            return self.uart.load(offset, size);
        }
        warn!(addr = format!("{addr:#x}"), "load to unmapped address");
        Err(Trap::LoadAccessFault(addr))
    }

    /// Writes the low `size` bits of `value` at `addr`, dispatching to the owning device.
    ///
    /// # Errors
    /// `Trap::StoreAmoAccessFault(addr)` if no device's region contains `addr`, or
    /// whatever fault kind the owning device reports for an in-range miss.
    pub fn store(&mut self, addr: u64, size: u32, value: u64) -> Result<(), Trap> {
        if let Some(offset) = in_range(addr, DRAM_BASE, self.dram.address_range().1) {
            return self.dram.store(offset, size, value);
        }
        if let Some(offset) = in_range(addr, CLINT_BASE, CLINT_SIZE) {
            return self.clint.store(offset, size, value);
        }
        if let Some(offset) = in_range(addr, PLIC_BASE, PLIC_SIZE) {
            return self.plic.store(offset, size, value);
        }
        if let Some(offset) = in_range(addr, UART_BASE, UART_SIZE) {
            return self.uart.store(offset, size, value);
        }
        warn!(addr = format!("{addr:#x}"), "store to unmapped address");
        Err(Trap::StoreAmoAccessFault(addr))
    }

    /// Copies `image` into DRAM starting at `DRAM_BASE`.
    ///
    /// # Errors
    /// `Trap::StoreAmoAccessFault` if the image does not fit in DRAM (the CLI
    /// checks this ahead of time via `HostError::ImageTooLarge` and never
    /// relies on this fallback in practice).
    pub fn load_image(&mut self, image: &[u8]) -> Result<(), Trap> {
        self.dram.load_image(0, image)
    }
}

fn in_range(addr: u64, base: u64, size: u64) -> Option<u64> {
    let offset = addr.checked_sub(base)?;
    (offset < size).then_some(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::constants::DRAM_SIZE;

    #[test]
    fn dram_access_round_trips_through_the_bus() {
        let mut bus = Bus::new(DRAM_SIZE, true);
        bus.store(DRAM_BASE, 64, 0x1234).unwrap();
        assert_eq!(bus.load(DRAM_BASE, 64).unwrap(), 0x1234);
    }

    #[test]
    fn unmapped_address_faults() {
        let mut bus = Bus::new(DRAM_SIZE, true);
        assert!(matches!(
            bus.load(0x2_0000_0000, 8),
            Err(Trap::LoadAccessFault(_))
        ));
    }

    #[test]
    fn device_size_mismatch_surfaces_as_device_fault_kind() {
        let mut bus = Bus::new(DRAM_SIZE, true);
        assert!(matches!(
            bus.store(CLINT_BASE + 0x4000, 32, 1),
            Err(Trap::StoreAmoAccessFault(_))
        ));
    }

    #[test]
    fn smaller_configured_dram_shrinks_the_routed_range() {
        let mut bus = Bus::new(4096, true);
        bus.store(DRAM_BASE + 100, 64, 7).unwrap();
        assert!(matches!(
            bus.store(DRAM_BASE + 4096, 64, 7),
            Err(Trap::StoreAmoAccessFault(_))
        ));
    }
}
