//! Main memory: a zero-initialized byte buffer overlaid with the boot image.

use std::fmt;

use tracing::info;

use crate::common::constants::{DRAM_BASE, DRAM_SIZE};
use crate::common::error::Trap;
use crate::soc::traits::Device;

/// A contiguous, safely-owned block of main memory.
///
/// No raw pointers or `mmap`: at 128 MiB, accessed one instruction at a time,
/// a `Vec<u8>` costs nothing measurable against this system's actual workload.
pub struct Dram {
    bytes: Vec<u8>,
}

impl fmt::Debug for Dram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dram").field("size", &self.bytes.len()).finish()
    }
}

impl Dram {
    /// Creates a zero-filled DRAM of `size` bytes.
    #[must_use]
    pub fn new(size: u64) -> Self {
        info!(size, base = format!("{DRAM_BASE:#x}"), "DRAM attached");
        Self {
            bytes: vec![0u8; size as usize],
        }
    }

    fn check_range(&self, offset: u64, size: u32) -> Option<usize> {
        let len = (size / 8) as u64;
        let end = offset.checked_add(len)?;
        if end > self.bytes.len() as u64 {
            return None;
        }
        Some(offset as usize)
    }
}

impl Default for Dram {
    fn default() -> Self {
        Self::new(DRAM_SIZE)
    }
}

impl Device for Dram {
    fn name(&self) -> &str {
        "DRAM"
    }

    fn address_range(&self) -> (u64, u64) {
        (DRAM_BASE, self.bytes.len() as u64)
    }

    fn load(&mut self, offset: u64, size: u32) -> Result<u64, Trap> {
        let fault_addr = DRAM_BASE + offset;
        let Some(start) = self.check_range(offset, size) else {
            return Err(Trap::LoadAccessFault(fault_addr));
        };
        let value = match size {
            8 => u64::from(self.bytes[start]),
            16 => u64::from(u16::from_le_bytes(
                self.bytes[start..start + 2].try_into().unwrap(),
            )),
            32 => u64::from(u32::from_le_bytes(
                self.bytes[start..start + 4].try_into().unwrap(),
            )),
            64 => u64::from_le_bytes(self.bytes[start..start + 8].try_into().unwrap()),
            _ => return Err(Trap::LoadAccessFault(fault_addr)),
        };
        Ok(value)
    }

    fn store(&mut self, offset: u64, size: u32, value: u64) -> Result<(), Trap> {
        let fault_addr = DRAM_BASE + offset;
        let Some(start) = self.check_range(offset, size) else {
            return Err(Trap::StoreAmoAccessFault(fault_addr));
        };
        match size {
            8 => self.bytes[start] = value as u8,
            16 => self.bytes[start..start + 2].copy_from_slice(&(value as u16).to_le_bytes()),
            32 => self.bytes[start..start + 4].copy_from_slice(&(value as u32).to_le_bytes()),
            64 => self.bytes[start..start + 8].copy_from_slice(&value.to_le_bytes()),
            _ => return Err(Trap::StoreAmoAccessFault(fault_addr)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(8)]
    #[case(16)]
    #[case(32)]
    #[case(64)]
    fn round_trips_every_width(#[case] size: u32) {
        let mut dram = Dram::new(DRAM_SIZE);
        let mask = if size == 64 { u64::MAX } else { (1u64 << size) - 1 };
        dram.store(0, size, 0xdead_beef_1234_5678 & mask).unwrap();
        assert_eq!(dram.load(0, size).unwrap(), 0xdead_beef_1234_5678 & mask);
    }

    #[test]
    fn little_endian_law() {
        let mut dram = Dram::new(DRAM_SIZE);
        dram.store(0, 64, 0x1122_3344_5566_7788).unwrap();
        assert_eq!(dram.load(0, 8).unwrap(), 0x88);
        assert_eq!(dram.load(1, 8).unwrap(), 0x77);
    }

    #[test]
    fn out_of_range_load_faults() {
        let mut dram = Dram::new(DRAM_SIZE);
        assert!(matches!(
            dram.load(DRAM_SIZE, 8),
            Err(Trap::LoadAccessFault(_))
        ));
    }

    #[test]
    fn unsupported_size_faults() {
        let mut dram = Dram::new(DRAM_SIZE);
        assert!(matches!(
            dram.store(0, 24, 0),
            Err(Trap::StoreAmoAccessFault(_))
        ));
    }
}
