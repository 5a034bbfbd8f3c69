//! Instruction encoding: opcodes, function-code constants, and the decoder.
//!
//! Covers the base integer instruction set (RV64I) plus the Zicsr system
//! instructions this core recognizes. No compressed, multiply/divide,
//! atomic, or floating-point encodings are decoded.

/// Instruction decoding: raw bits to a `Decoded` struct.
pub mod decode;

/// `funct3` field constants.
pub mod funct3;

/// `funct7` field constants.
pub mod funct7;

/// Instruction field extraction (`InstructionBits`) and the `Decoded` struct.
pub mod instruction;

/// Major opcode constants.
pub mod opcodes;

/// System instruction encodings (ECALL, EBREAK, MRET, SRET, SFENCE.VMA).
pub mod privileged;
