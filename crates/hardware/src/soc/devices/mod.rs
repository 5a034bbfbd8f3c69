//! Memory-mapped I/O devices: main memory, timer, interrupt controller, serial port.

/// Core Local Interruptor (`mtime`/`mtimecmp`).
pub mod clint;

/// Main memory.
pub mod dram;

/// Platform-Level Interrupt Controller.
pub mod plic;

/// UART serial port.
pub mod uart;

pub use clint::Clint;
pub use dram::Dram;
pub use plic::Plic;
pub use uart::Uart;

pub use crate::soc::traits::Device;
