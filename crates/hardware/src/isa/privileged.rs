//! System instruction encodings: ECALL, EBREAK, the trap-return instructions, and SFENCE.VMA.
//!
//! These share `OP_SYSTEM` with the CSR instructions but are distinguished by
//! their full 32-bit encoding rather than by `funct3`/`funct7` fields.

/// Environment Call. Traps to the next-higher privilege level.
pub const ECALL: u32 = 0x0000_0073;

/// Environment Break. Raises a breakpoint trap.
pub const EBREAK: u32 = 0x0010_0073;

/// Machine Return. Restores the pre-trap state from `mstatus`/`mepc`.
pub const MRET: u32 = 0x3020_0073;

/// Supervisor Return. Restores the pre-trap state from `sstatus`/`sepc`.
pub const SRET: u32 = 0x1020_0073;

/// Supervisor Memory-Management Fence. No-op on a core without an MMU.
pub const SFENCE_VMA: u32 = 0x1200_0073;
