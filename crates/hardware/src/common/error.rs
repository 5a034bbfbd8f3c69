//! Trap representations.
//!
//! This module defines the architectural traps a hart can raise. It provides:
//! 1. **Exceptions:** synchronous conditions raised by fetch/decode/execute/memory access.
//! 2. **Interrupts:** asynchronous conditions sampled after each retired instruction.
//! 3. **Cause encoding:** the mapping from a `Trap` to its `(is_interrupt, code)` pair.

use thiserror::Error;

/// An architectural trap: a typed kind plus the 64-bit trap value that
/// accompanies it into `mtval`/`stval`.
///
/// `step()` returns `Result<u64, Trap>`: `Ok(next_pc)` on a completed
/// instruction, `Err(trap)` when fetch, decode, execute, or a memory access
/// could not complete. This is the sum of `{next_pc, trap{kind, value}}`
/// the trap delivery pipeline is built around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Trap {
    /// A jump/branch target (or the fetch `pc` itself) was not 4-byte aligned.
    #[error("instruction address misaligned: {0:#x}")]
    InstructionAddressMisaligned(u64),
    /// The bus faulted while fetching a 32-bit instruction word.
    #[error("instruction access fault: {0:#x}")]
    InstructionAccessFault(u64),
    /// The fetched word did not decode to any supported instruction.
    #[error("illegal instruction: {0:#010x}")]
    IllegalInstruction(u32),
    /// `ebreak` was executed.
    #[error("breakpoint")]
    Breakpoint,
    /// A load address was not aligned to its access size.
    #[error("load address misaligned: {0:#x}")]
    LoadAddressMisaligned(u64),
    /// The bus or a device faulted servicing a load.
    #[error("load access fault: {0:#x}")]
    LoadAccessFault(u64),
    /// A store/AMO address was not aligned to its access size.
    #[error("store/amo address misaligned: {0:#x}")]
    StoreAmoAddressMisaligned(u64),
    /// The bus or a device faulted servicing a store.
    #[error("store/amo access fault: {0:#x}")]
    StoreAmoAccessFault(u64),
    /// `ecall` from U-mode.
    #[error("environment call from u-mode")]
    EnvironmentCallFromUMode,
    /// `ecall` from S-mode.
    #[error("environment call from s-mode")]
    EnvironmentCallFromSMode,
    /// `ecall` from M-mode.
    #[error("environment call from m-mode")]
    EnvironmentCallFromMMode,
    /// Reserved for completeness of the cause-code table; unreachable without an MMU.
    #[error("instruction page fault: {0:#x}")]
    InstructionPageFault(u64),
    /// Reserved for completeness of the cause-code table; unreachable without an MMU.
    #[error("load page fault: {0:#x}")]
    LoadPageFault(u64),
    /// Reserved for completeness of the cause-code table; unreachable without an MMU.
    #[error("store/amo page fault: {0:#x}")]
    StoreAmoPageFault(u64),

    /// Supervisor software interrupt.
    #[error("supervisor software interrupt")]
    SupervisorSoftwareInterrupt,
    /// Machine software interrupt.
    #[error("machine software interrupt")]
    MachineSoftwareInterrupt,
    /// Supervisor timer interrupt.
    #[error("supervisor timer interrupt")]
    SupervisorTimerInterrupt,
    /// Machine timer interrupt.
    #[error("machine timer interrupt")]
    MachineTimerInterrupt,
    /// Supervisor external interrupt.
    #[error("supervisor external interrupt")]
    SupervisorExternalInterrupt,
    /// Machine external interrupt.
    #[error("machine external interrupt")]
    MachineExternalInterrupt,
}

impl Trap {
    /// Returns `(is_interrupt, code)` per the RISC-V `mcause`/`scause` encoding:
    /// the interrupt bit occupies bit 63, the low bits carry the cause number.
    #[must_use]
    pub fn cause_code(self) -> (bool, u64) {
        match self {
            Trap::InstructionAddressMisaligned(_) => (false, 0),
            Trap::InstructionAccessFault(_) => (false, 1),
            Trap::IllegalInstruction(_) => (false, 2),
            Trap::Breakpoint => (false, 3),
            Trap::LoadAddressMisaligned(_) => (false, 4),
            Trap::LoadAccessFault(_) => (false, 5),
            Trap::StoreAmoAddressMisaligned(_) => (false, 6),
            Trap::StoreAmoAccessFault(_) => (false, 7),
            Trap::EnvironmentCallFromUMode => (false, 8),
            Trap::EnvironmentCallFromSMode => (false, 9),
            Trap::EnvironmentCallFromMMode => (false, 11),
            Trap::InstructionPageFault(_) => (false, 12),
            Trap::LoadPageFault(_) => (false, 13),
            Trap::StoreAmoPageFault(_) => (false, 15),
            Trap::SupervisorSoftwareInterrupt => (true, 1),
            Trap::MachineSoftwareInterrupt => (true, 3),
            Trap::SupervisorTimerInterrupt => (true, 5),
            Trap::MachineTimerInterrupt => (true, 7),
            Trap::SupervisorExternalInterrupt => (true, 9),
            Trap::MachineExternalInterrupt => (true, 11),
        }
    }

    /// The value that accompanies this trap into `mtval`/`stval`: the
    /// faulting address, the illegal instruction word, or 0.
    #[must_use]
    pub fn value(self) -> u64 {
        match self {
            Trap::InstructionAddressMisaligned(v)
            | Trap::InstructionAccessFault(v)
            | Trap::LoadAddressMisaligned(v)
            | Trap::LoadAccessFault(v)
            | Trap::StoreAmoAddressMisaligned(v)
            | Trap::StoreAmoAccessFault(v)
            | Trap::InstructionPageFault(v)
            | Trap::LoadPageFault(v)
            | Trap::StoreAmoPageFault(v) => v,
            Trap::IllegalInstruction(v) => u64::from(v),
            _ => 0,
        }
    }

    /// Whether this trap belongs to the fatal subset (§7): the misaligned
    /// and access-fault families plus `IllegalInstruction`. A fatal trap
    /// re-raised while the handler for it is still being entered terminates
    /// the run rather than looping forever.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            Trap::InstructionAddressMisaligned(_)
                | Trap::InstructionAccessFault(_)
                | Trap::IllegalInstruction(_)
                | Trap::LoadAddressMisaligned(_)
                | Trap::LoadAccessFault(_)
                | Trap::StoreAmoAddressMisaligned(_)
                | Trap::StoreAmoAccessFault(_)
        )
    }
}

/// Errors surfaced at the host boundary (CLI); these never enter the hart.
#[derive(Debug, Error)]
pub enum HostError {
    /// The input binary could not be read.
    #[error("failed to read binary {path}: {source}")]
    ReadBinary {
        /// Path that failed to open.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The input binary is larger than DRAM.
    #[error("binary is {size} bytes, which does not fit in {dram_size}-byte DRAM")]
    ImageTooLarge {
        /// Size of the binary image in bytes.
        size: usize,
        /// Capacity of DRAM in bytes.
        dram_size: usize,
    },
    /// A `--config` override file could not be parsed.
    #[error("failed to parse config {path}: {source}")]
    ParseConfig {
        /// Path that failed to parse.
        path: String,
        /// Underlying JSON failure.
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cause_codes_match_privileged_spec() {
        assert_eq!(Trap::InstructionAddressMisaligned(0).cause_code(), (false, 0));
        assert_eq!(Trap::IllegalInstruction(0).cause_code(), (false, 2));
        assert_eq!(Trap::StoreAmoAccessFault(0).cause_code(), (false, 7));
        assert_eq!(Trap::EnvironmentCallFromMMode.cause_code(), (false, 11));
        assert_eq!(Trap::MachineTimerInterrupt.cause_code(), (true, 7));
        assert_eq!(Trap::SupervisorExternalInterrupt.cause_code(), (true, 9));
    }

    #[test]
    fn fatal_subset_excludes_ecall_and_breakpoint() {
        assert!(Trap::LoadAccessFault(0).is_fatal());
        assert!(Trap::IllegalInstruction(0).is_fatal());
        assert!(!Trap::EnvironmentCallFromMMode.is_fatal());
        assert!(!Trap::Breakpoint.is_fatal());
    }

    #[test]
    fn value_carries_trap_payload() {
        assert_eq!(Trap::LoadAccessFault(0x8000_1000).value(), 0x8000_1000);
        assert_eq!(Trap::EnvironmentCallFromUMode.value(), 0);
    }
}
