//! Global system constants.
//!
//! This module defines the fixed memory map and the interrupt bit positions
//! shared between the CSR file, the bus, and the trap pipeline.

/// Base physical address of main memory.
pub const DRAM_BASE: u64 = 0x8000_0000;

/// Default size of main memory in bytes (128 MiB). `Config::dram_size` may
/// override this; the bus then routes against the configured size, not this
/// constant.
pub const DRAM_SIZE: u64 = 128 * 1024 * 1024;

/// Base physical address of the Core Local Interruptor.
pub const CLINT_BASE: u64 = 0x0200_0000;

/// Size in bytes of the CLINT's address window.
pub const CLINT_SIZE: u64 = 0x1_0000;

/// Base physical address of the Platform-Level Interrupt Controller.
pub const PLIC_BASE: u64 = 0x0c00_0000;

/// Size in bytes of the PLIC's address window.
pub const PLIC_SIZE: u64 = 0x0400_0000;

/// Base physical address of the UART.
pub const UART_BASE: u64 = 0x1000_0000;

/// Size in bytes of the UART's address window.
pub const UART_SIZE: u64 = 0x100;

/// IRQ line number the UART raises on the PLIC.
pub const UART_IRQ: u32 = 10;

/// Bit mask indicating that a trap cause represents an interrupt (bit 63).
pub const CAUSE_INTERRUPT_BIT: u64 = 1 << 63;

/// Bit position for supervisor software interrupt delegation in `mideleg`.
pub const SSIP_BIT: u64 = 1;
/// Bit position for machine software interrupt delegation in `mideleg`.
pub const MSIP_BIT: u64 = 3;
/// Bit position for supervisor timer interrupt delegation in `mideleg`.
pub const STIP_BIT: u64 = 5;
/// Bit position for machine timer interrupt delegation in `mideleg`.
pub const MTIP_BIT: u64 = 7;
/// Bit position for supervisor external interrupt delegation in `mideleg`.
pub const SEIP_BIT: u64 = 9;
/// Bit position for machine external interrupt delegation in `mideleg`.
pub const MEIP_BIT: u64 = 11;
