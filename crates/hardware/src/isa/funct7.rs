//! `funct7` field definitions, used to disambiguate R-type instructions sharing a `funct3`.

/// Default operation (ADD, SRL).
pub const DEFAULT: u32 = 0b0000000;

/// Alternate operation: SUB (with `ADD_SUB`) or SRA (with `SRL_SRA`).
pub const SUB: u32 = 0b0100000;
/// Alias of `SUB` for the shift-right case.
pub const SRA: u32 = 0b0100000;
