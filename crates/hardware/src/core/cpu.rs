//! The hart: registers, PC, privilege mode, CSRs, and the bus it drives.
//!
//! Control flow is a serial fetch-decode-execute loop: [`Cpu::step`] performs
//! one instruction and reports either the next `pc` or the trap that aborted
//! it; [`Cpu::run_instruction`] wraps that with trap delivery and interrupt
//! polling, the unit the host loop actually drives.

use tracing::{trace, warn};

use crate::common::constants::{
    CAUSE_INTERRUPT_BIT, MEIP_BIT, MSIP_BIT, MTIP_BIT, SEIP_BIT, SSIP_BIT, STIP_BIT,
};
use crate::common::error::Trap;
use crate::core::csr::{
    Csr, MCAUSE, MEPC, MIE, MIP, MSTATUS, MSTATUS_MIE, MSTATUS_MPIE, MSTATUS_MPP, MSTATUS_SIE,
    MSTATUS_SPIE, MSTATUS_SPP, MTVAL, MTVEC, SCAUSE, SEPC, SSTATUS, STVAL, STVEC,
};
use crate::core::gpr::Gpr;
use crate::core::mode::PrivilegeMode;
use crate::isa::decode::decode;
use crate::isa::instruction::Decoded;
use crate::isa::{funct3, funct7, opcodes, privileged};
use crate::soc::traits::Device;
use crate::soc::Bus;

/// Interrupt priority order (highest first), paired with the `mip`/`mie` bit,
/// the architectural cause code, and the trap value raised when delivered.
const INTERRUPT_PRIORITY: [(u64, u64, Trap); 6] = [
    (MEIP_BIT, 11, Trap::MachineExternalInterrupt),
    (MSIP_BIT, 3, Trap::MachineSoftwareInterrupt),
    (MTIP_BIT, 7, Trap::MachineTimerInterrupt),
    (SEIP_BIT, 9, Trap::SupervisorExternalInterrupt),
    (SSIP_BIT, 1, Trap::SupervisorSoftwareInterrupt),
    (STIP_BIT, 5, Trap::SupervisorTimerInterrupt),
];

/// The single simulated hart.
#[derive(Debug)]
pub struct Cpu {
    /// 32 general-purpose integer registers.
    pub regs: Gpr,
    /// Program counter.
    pub pc: u64,
    /// Control and status register bank.
    pub csrs: Csr,
    /// Current privilege level.
    pub mode: PrivilegeMode,
    /// The bus owning DRAM, CLINT, PLIC, and the UART.
    pub bus: Bus,
}

impl Cpu {
    /// Creates a hart at reset state: `pc = initial_pc`, `mode = Machine`,
    /// every CSR zero, `sp` at the exclusive end of the bus's DRAM so
    /// bare-metal code can push immediately.
    #[must_use]
    pub fn new(bus: Bus, initial_pc: u64) -> Self {
        let (dram_base, dram_size) = bus.dram.address_range();
        let mut regs = Gpr::new();
        regs.write(2, dram_base + dram_size);
        Self {
            regs,
            pc: initial_pc,
            csrs: Csr::new(),
            mode: PrivilegeMode::Machine,
            bus,
        }
    }

    /// Copies a flat boot image into DRAM at `DRAM_BASE`.
    ///
    /// # Errors
    /// Propagates a `Trap::StoreAmoAccessFault` if the image does not fit.
    pub fn load_image(&mut self, image: &[u8]) -> Result<(), Trap> {
        self.bus.load_image(image)
    }

    /// Executes one instruction: fetch, decode, execute.
    ///
    /// Returns the next `pc` on success. On failure, `pc` is left untouched —
    /// the caller is responsible for trap delivery via [`Cpu::take_trap`].
    ///
    /// # Errors
    /// Any trap raised by an unaligned fetch, a bus fault, an illegal
    /// encoding, or a faulting load/store/CSR access.
    pub fn step(&mut self) -> Result<u64, Trap> {
        if self.pc % 4 != 0 {
            return Err(Trap::InstructionAddressMisaligned(self.pc));
        }

        let raw = self.bus.load(self.pc, 32).map_err(|trap| match trap {
            Trap::LoadAccessFault(addr) => Trap::InstructionAccessFault(addr),
            other => other,
        })? as u32;

        let decoded = decode(raw);
        trace!(pc = format!("{:#x}", self.pc), inst = format!("{raw:#010x}"), "fetch");
        self.execute(&decoded)
    }

    /// Runs one instruction to completion: `step`, trap delivery on failure,
    /// then interrupt polling. Returns `Some(trap)` if a fatal trap was just
    /// delivered, so the host loop knows to stop.
    pub fn run_instruction(&mut self) -> Option<Trap> {
        let pc_before = self.pc;
        let mut fatal = None;

        match self.step() {
            Ok(next_pc) => self.pc = next_pc,
            Err(trap) => {
                warn!(?trap, pc = format!("{pc_before:#x}"), "trap raised");
                self.take_trap(trap, pc_before);
                if trap.is_fatal() {
                    fatal = Some(trap);
                }
            }
        }

        self.bus.clint.tick();
        if let Some(trap) = self.poll_interrupts() {
            let epc = self.pc;
            self.take_trap(trap, epc);
        }

        fatal
    }

    fn execute(&mut self, d: &Decoded) -> Result<u64, Trap> {
        let pc = self.pc;
        match d.opcode {
            opcodes::OP_LUI => {
                self.regs.write(d.rd, d.imm as u64);
                Ok(pc + 4)
            }
            opcodes::OP_AUIPC => {
                self.regs.write(d.rd, pc.wrapping_add(d.imm as u64));
                Ok(pc + 4)
            }
            opcodes::OP_JAL => {
                let target = pc.wrapping_add(d.imm as u64);
                check_aligned(target)?;
                self.regs.write(d.rd, pc + 4);
                Ok(target)
            }
            opcodes::OP_JALR => {
                let target = (self.regs.read(d.rs1).wrapping_add(d.imm as u64)) & !1;
                check_aligned(target)?;
                self.regs.write(d.rd, pc + 4);
                Ok(target)
            }
            opcodes::OP_BRANCH => self.execute_branch(d),
            opcodes::OP_LOAD => self.execute_load(d),
            opcodes::OP_STORE => self.execute_store(d),
            opcodes::OP_IMM => {
                self.execute_op_imm(d);
                Ok(pc + 4)
            }
            opcodes::OP_IMM_32 => {
                self.execute_op_imm_32(d);
                Ok(pc + 4)
            }
            opcodes::OP_REG => {
                self.execute_op_reg(d);
                Ok(pc + 4)
            }
            opcodes::OP_REG_32 => {
                self.execute_op_reg_32(d);
                Ok(pc + 4)
            }
            opcodes::OP_MISC_MEM => Ok(pc + 4),
            opcodes::OP_SYSTEM => self.execute_system(d),
            _ => Err(Trap::IllegalInstruction(d.raw)),
        }
    }

    fn execute_branch(&mut self, d: &Decoded) -> Result<u64, Trap> {
        let lhs = self.regs.read(d.rs1);
        let rhs = self.regs.read(d.rs2);
        let taken = match d.funct3 {
            funct3::BEQ => lhs == rhs,
            funct3::BNE => lhs != rhs,
            funct3::BLT => (lhs as i64) < (rhs as i64),
            funct3::BGE => (lhs as i64) >= (rhs as i64),
            funct3::BLTU => lhs < rhs,
            funct3::BGEU => lhs >= rhs,
            _ => return Err(Trap::IllegalInstruction(d.raw)),
        };
        if taken {
            let target = self.pc.wrapping_add(d.imm as u64);
            check_aligned(target)?;
            Ok(target)
        } else {
            Ok(self.pc + 4)
        }
    }

    fn execute_load(&mut self, d: &Decoded) -> Result<u64, Trap> {
        let addr = self.regs.read(d.rs1).wrapping_add(d.imm as u64);
        let (size, sign_extend) = match d.funct3 {
            funct3::LB => (8, true),
            funct3::LH => (16, true),
            funct3::LW => (32, true),
            funct3::LD => (64, false),
            funct3::LBU => (8, false),
            funct3::LHU => (16, false),
            funct3::LWU => (32, false),
            _ => return Err(Trap::IllegalInstruction(d.raw)),
        };
        let raw = self.bus.load(addr, size)?;
        let value = if sign_extend && size < 64 {
            let shift = 64 - size;
            (((raw << shift) as i64) >> shift) as u64
        } else {
            raw
        };
        self.regs.write(d.rd, value);
        Ok(self.pc + 4)
    }

    fn execute_store(&mut self, d: &Decoded) -> Result<u64, Trap> {
        let addr = self.regs.read(d.rs1).wrapping_add(d.imm as u64);
        let size = match d.funct3 {
            funct3::SB => 8,
            funct3::SH => 16,
            funct3::SW => 32,
            funct3::SD => 64,
            _ => return Err(Trap::IllegalInstruction(d.raw)),
        };
        self.bus.store(addr, size, self.regs.read(d.rs2))?;
        Ok(self.pc + 4)
    }

    fn execute_op_imm(&mut self, d: &Decoded) {
        let rs1 = self.regs.read(d.rs1);
        let imm = d.imm as u64;
        let result = match d.funct3 {
            funct3::ADD_SUB => rs1.wrapping_add(imm),
            funct3::SLT => u64::from((rs1 as i64) < (d.imm)),
            funct3::SLTU => u64::from(rs1 < imm),
            funct3::XOR => rs1 ^ imm,
            funct3::OR => rs1 | imm,
            funct3::AND => rs1 & imm,
            funct3::SLL => rs1 << (imm & 0x3f),
            funct3::SRL_SRA => {
                let shamt = imm & 0x3f;
                if d.funct7 & 0x20 != 0 {
                    ((rs1 as i64) >> shamt) as u64
                } else {
                    rs1 >> shamt
                }
            }
            _ => unreachable!("funct3 is a 3-bit field, all values covered"),
        };
        self.regs.write(d.rd, result);
    }

    fn execute_op_imm_32(&mut self, d: &Decoded) {
        let rs1 = self.regs.read(d.rs1) as u32;
        let imm = d.imm as u32;
        let shamt = imm & 0x1f;
        let result = match d.funct3 {
            funct3::ADD_SUB => rs1.wrapping_add(imm),
            funct3::SLL => rs1 << shamt,
            funct3::SRL_SRA => {
                if d.funct7 & 0x20 != 0 {
                    ((rs1 as i32) >> shamt) as u32
                } else {
                    rs1 >> shamt
                }
            }
            _ => rs1,
        };
        self.regs.write(d.rd, i64::from(result as i32) as u64);
    }

    fn execute_op_reg(&mut self, d: &Decoded) {
        let rs1 = self.regs.read(d.rs1);
        let rs2 = self.regs.read(d.rs2);
        let result = match (d.funct3, d.funct7 & 0x20 != 0) {
            (funct3::ADD_SUB, false) => rs1.wrapping_add(rs2),
            (funct3::ADD_SUB, true) => rs1.wrapping_sub(rs2),
            (funct3::SLL, _) => rs1 << (rs2 & 0x3f),
            (funct3::SLT, _) => u64::from((rs1 as i64) < (rs2 as i64)),
            (funct3::SLTU, _) => u64::from(rs1 < rs2),
            (funct3::XOR, _) => rs1 ^ rs2,
            (funct3::SRL_SRA, false) => rs1 >> (rs2 & 0x3f),
            (funct3::SRL_SRA, true) => ((rs1 as i64) >> (rs2 & 0x3f)) as u64,
            (funct3::OR, _) => rs1 | rs2,
            (funct3::AND, _) => rs1 & rs2,
            _ => unreachable!("funct3 is a 3-bit field, all values covered"),
        };
        self.regs.write(d.rd, result);
    }

    fn execute_op_reg_32(&mut self, d: &Decoded) {
        let rs1 = self.regs.read(d.rs1) as u32;
        let rs2 = self.regs.read(d.rs2) as u32;
        let shamt = rs2 & 0x1f;
        let result = match (d.funct3, d.funct7 & 0x20 != 0) {
            (funct3::ADD_SUB, false) => rs1.wrapping_add(rs2),
            (funct3::ADD_SUB, true) => rs1.wrapping_sub(rs2),
            (funct3::SLL, _) => rs1 << shamt,
            (funct3::SRL_SRA, false) => rs1 >> shamt,
            (funct3::SRL_SRA, true) => ((rs1 as i32) >> shamt) as u32,
            _ => rs1,
        };
        self.regs.write(d.rd, i64::from(result as i32) as u64);
    }

    fn execute_system(&mut self, d: &Decoded) -> Result<u64, Trap> {
        // sfence.vma's rs1/rs2 fields carry real (if ignored) operands, so match
        // it with those bits masked out rather than against the exact raw word.
        const SFENCE_VMA_MASK: u32 = 0xfe00_7fff;
        match d.raw {
            privileged::ECALL => Err(match self.mode {
                PrivilegeMode::User => Trap::EnvironmentCallFromUMode,
                PrivilegeMode::Supervisor => Trap::EnvironmentCallFromSMode,
                PrivilegeMode::Machine => Trap::EnvironmentCallFromMMode,
            }),
            privileged::EBREAK => Err(Trap::Breakpoint),
            privileged::MRET => Ok(self.do_mret()),
            privileged::SRET => Ok(self.do_sret()),
            _ if d.raw & SFENCE_VMA_MASK == privileged::SFENCE_VMA => Ok(self.pc + 4),
            _ if d.funct3 != 0 => self.execute_csr(d),
            _ => Err(Trap::IllegalInstruction(d.raw)),
        }
    }

    fn execute_csr(&mut self, d: &Decoded) -> Result<u64, Trap> {
        let addr = (d.raw >> 20) & 0xfff;
        let required_priv = (addr >> 8) & 0b11;
        if u32::from(self.mode.to_u8()) < required_priv {
            return Err(Trap::IllegalInstruction(d.raw));
        }

        let old = self.csrs.read(addr);
        let zimm = d.rs1 as u64;
        let rs1 = self.regs.read(d.rs1);
        match d.funct3 {
            funct3::CSRRW => self.csrs.write(addr, rs1),
            funct3::CSRRS => {
                if d.rs1 != 0 {
                    self.csrs.write(addr, old | rs1);
                }
            }
            funct3::CSRRC => {
                if d.rs1 != 0 {
                    self.csrs.write(addr, old & !rs1);
                }
            }
            funct3::CSRRWI => self.csrs.write(addr, zimm),
            funct3::CSRRSI => {
                if zimm != 0 {
                    self.csrs.write(addr, old | zimm);
                }
            }
            funct3::CSRRCI => {
                if zimm != 0 {
                    self.csrs.write(addr, old & !zimm);
                }
            }
            _ => return Err(Trap::IllegalInstruction(d.raw)),
        }
        self.regs.write(d.rd, old);
        Ok(self.pc + 4)
    }

    fn do_mret(&mut self) -> u64 {
        let mstatus = self.csrs.read(MSTATUS);
        let mpp = PrivilegeMode::from_u8(((mstatus & MSTATUS_MPP) >> 11) as u8);
        let mpie = mstatus & MSTATUS_MPIE != 0;

        let mut new_mstatus = if mpie {
            mstatus | MSTATUS_MIE
        } else {
            mstatus & !MSTATUS_MIE
        };
        new_mstatus |= MSTATUS_MPIE;
        new_mstatus &= !MSTATUS_MPP;
        self.csrs.write(MSTATUS, new_mstatus);
        self.mode = mpp;
        self.csrs.read(MEPC) & !0b11
    }

    fn do_sret(&mut self) -> u64 {
        let sstatus = self.csrs.read(SSTATUS);
        let spp = sstatus & MSTATUS_SPP != 0;
        let spie = sstatus & MSTATUS_SPIE != 0;

        let mut new_sstatus = if spie {
            sstatus | MSTATUS_SIE
        } else {
            sstatus & !MSTATUS_SIE
        };
        new_sstatus |= MSTATUS_SPIE;
        new_sstatus &= !MSTATUS_SPP;
        self.csrs.write(SSTATUS, new_sstatus);
        self.mode = if spp {
            PrivilegeMode::Supervisor
        } else {
            PrivilegeMode::User
        };
        self.csrs.read(SEPC) & !0b11
    }

    /// Delivers `trap`, interrupted at `epc`: decides M- vs S-mode delegation,
    /// updates the matching privileged register group atomically, and
    /// redirects `pc` to the handler's direct-mode base.
    pub fn take_trap(&mut self, trap: Trap, epc: u64) {
        let (is_interrupt, code) = trap.cause_code();
        let value = trap.value();
        let delegated = self.mode <= PrivilegeMode::Supervisor
            && if is_interrupt {
                self.csrs.is_midelegated(code)
            } else {
                self.csrs.is_medelegated(code)
            };
        let cause = code | if is_interrupt { CAUSE_INTERRUPT_BIT } else { 0 };

        if delegated {
            let sstatus = self.csrs.read(SSTATUS);
            let sie = sstatus & MSTATUS_SIE != 0;
            let mut new_sstatus = if sie {
                sstatus | MSTATUS_SPIE
            } else {
                sstatus & !MSTATUS_SPIE
            };
            new_sstatus &= !MSTATUS_SIE;
            new_sstatus = if self.mode == PrivilegeMode::Supervisor {
                new_sstatus | MSTATUS_SPP
            } else {
                new_sstatus & !MSTATUS_SPP
            };
            self.csrs.write(SSTATUS, new_sstatus);
            self.csrs.write(SEPC, epc);
            self.csrs.write(SCAUSE, cause);
            self.csrs.write(STVAL, value);
            self.mode = PrivilegeMode::Supervisor;
            self.pc = self.csrs.read(STVEC) & !0b11;
        } else {
            let mstatus = self.csrs.read(MSTATUS);
            let mie = mstatus & MSTATUS_MIE != 0;
            let mut new_mstatus = if mie {
                mstatus | MSTATUS_MPIE
            } else {
                mstatus & !MSTATUS_MPIE
            };
            new_mstatus &= !MSTATUS_MIE;
            new_mstatus &= !MSTATUS_MPP;
            new_mstatus |= u64::from(self.mode.to_u8()) << 11;
            self.csrs.write(MSTATUS, new_mstatus);
            self.csrs.write(MEPC, epc);
            self.csrs.write(MCAUSE, cause);
            self.csrs.write(MTVAL, value);
            self.mode = PrivilegeMode::Machine;
            self.pc = self.csrs.read(MTVEC) & !0b11;
        }
    }

    /// Samples device interrupt sources into `mip`, then returns the
    /// highest-priority unmasked pending interrupt, if any.
    fn poll_interrupts(&mut self) -> Option<Trap> {
        let mut mip = self.csrs.read(MIP);
        mip = if self.bus.clint.is_pending() {
            mip | (1 << MTIP_BIT)
        } else {
            mip & !(1 << MTIP_BIT)
        };
        if self.bus.uart.is_interrupting() || self.bus.plic.is_claimable() {
            mip |= 1 << SEIP_BIT;
        }
        self.csrs.write(MIP, mip);

        let mie = self.csrs.read(MIE);
        let pending = mie & mip;
        if pending == 0 {
            return None;
        }

        let mstatus = self.csrs.read(MSTATUS);
        let sstatus = self.csrs.read(SSTATUS);
        let m_enabled = self.mode < PrivilegeMode::Machine || (mstatus & MSTATUS_MIE != 0);
        let s_enabled =
            self.mode < PrivilegeMode::Supervisor || (sstatus & MSTATUS_SIE != 0 && self.mode == PrivilegeMode::Supervisor);

        for (bit, code, trap) in INTERRUPT_PRIORITY {
            if pending & (1 << bit) == 0 {
                continue;
            }
            let delegated = self.mode <= PrivilegeMode::Supervisor && self.csrs.is_midelegated(code);
            let enabled = if delegated { s_enabled } else { m_enabled };
            if enabled {
                return Some(trap);
            }
        }
        None
    }

    /// Dumps the register file and PC/mode to stderr, for the CLI's fatal-trap report.
    pub fn dump_state(&self) {
        eprintln!("pc = {:#018x}  mode = {}", self.pc, self.mode);
        self.regs.dump();
    }
}

fn check_aligned(target: u64) -> Result<(), Trap> {
    if target % 4 == 0 {
        Ok(())
    } else {
        Err(Trap::InstructionAddressMisaligned(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::constants::{DRAM_BASE, DRAM_SIZE};

    fn cpu_with(program: &[u8]) -> Cpu {
        let mut cpu = Cpu::new(Bus::new(DRAM_SIZE, true), DRAM_BASE);
        cpu.load_image(program).unwrap();
        cpu
    }

    fn encode_i(imm: i32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
        ((imm as u32) << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
    }

    fn encode_r(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
        (funct7 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
    }

    #[test]
    fn addi_writes_destination_register() {
        let inst = encode_i(42, 0, funct3::ADD_SUB, 31, opcodes::OP_IMM);
        let mut cpu = cpu_with(&inst.to_le_bytes());
        let next_pc = cpu.step().unwrap();
        assert_eq!(cpu.regs.read(31), 42);
        assert_eq!(next_pc, DRAM_BASE + 4);
    }

    #[test]
    fn add_accumulates_two_immediates() {
        let mut program = Vec::new();
        program.extend(encode_i(10, 0, funct3::ADD_SUB, 2, opcodes::OP_IMM).to_le_bytes());
        program.extend(encode_i(20, 0, funct3::ADD_SUB, 3, opcodes::OP_IMM).to_le_bytes());
        program.extend(
            encode_r(funct7::DEFAULT, 3, 2, funct3::ADD_SUB, 1, opcodes::OP_REG).to_le_bytes(),
        );
        let mut cpu = cpu_with(&program);
        for _ in 0..3 {
            let next = cpu.step().unwrap();
            cpu.pc = next;
        }
        assert_eq!(cpu.regs.read(1), 30);
    }

    #[test]
    fn srai_sign_extends_negative_shift() {
        let mut program = Vec::new();
        program.extend(encode_i(-16, 0, funct3::ADD_SUB, 2, opcodes::OP_IMM).to_le_bytes());
        program.extend(encode_i(3, 2, funct3::SRL_SRA, 1, opcodes::OP_IMM | (0x20 << 25)).to_le_bytes());
        let mut cpu = cpu_with(&program);
        cpu.pc = cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.regs.read(1), (-2i64) as u64);
    }

    #[test]
    fn lui_shifts_immediate_into_upper_bits() {
        let inst = (42u32 << 12) | (10 << 7) | opcodes::OP_LUI;
        let mut cpu = cpu_with(&inst.to_le_bytes());
        cpu.step().unwrap();
        assert_eq!(cpu.regs.read(10), 42 << 12);
    }

    #[test]
    fn auipc_adds_to_pc() {
        let inst = (42u32 << 12) | (10 << 7) | opcodes::OP_AUIPC;
        let mut cpu = cpu_with(&inst.to_le_bytes());
        cpu.step().unwrap();
        assert_eq!(cpu.regs.read(10), DRAM_BASE + (42 << 12));
    }

    #[test]
    fn jal_links_and_jumps() {
        let imm = 44i32;
        let inst = (((imm as u32) & 1) << 31)
            | ((((imm as u32) >> 1) & 0x3ff) << 21)
            | ((((imm as u32) >> 11) & 1) << 20)
            | ((((imm as u32) >> 12) & 0xff) << 12)
            | (10 << 7)
            | opcodes::OP_JAL;
        let mut cpu = cpu_with(&inst.to_le_bytes());
        let next = cpu.step().unwrap();
        assert_eq!(cpu.regs.read(10), DRAM_BASE + 4);
        assert_eq!(next, DRAM_BASE + 44);
    }

    #[test]
    fn csrrw_swaps_register_and_csr() {
        let mut program = Vec::new();
        program.extend(encode_i(5, 0, funct3::ADD_SUB, 2, opcodes::OP_IMM).to_le_bytes());
        program.extend(
            encode_i(crate::core::csr::MSTATUS as i32, 2, funct3::CSRRW, 1, opcodes::OP_SYSTEM)
                .to_le_bytes(),
        );
        let mut cpu = cpu_with(&program);
        cpu.pc = cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.csrs.read(MSTATUS), 5);
        assert_eq!(cpu.regs.read(1), 0);
    }

    #[test]
    fn mret_restores_mpp_and_sets_mpie() {
        let mut program = Vec::new();
        program.extend(encode_i(8, 0, funct3::ADD_SUB, 2, opcodes::OP_IMM).to_le_bytes());
        program.extend(
            encode_i(crate::core::csr::MEPC as i32, 2, funct3::CSRRW, 1, opcodes::OP_SYSTEM)
                .to_le_bytes(),
        );
        program.extend(privileged::MRET.to_le_bytes());
        let mut cpu = cpu_with(&program);
        cpu.pc = cpu.step().unwrap();
        cpu.pc = cpu.step().unwrap();
        let next = cpu.step().unwrap();
        assert_eq!(next, 8);
        assert_eq!(cpu.mode, PrivilegeMode::User);
        assert_eq!(cpu.csrs.read(MSTATUS) & MSTATUS_MPIE, MSTATUS_MPIE);
    }

    #[test]
    fn ecall_from_machine_mode_traps() {
        let mut cpu = cpu_with(&privileged::ECALL.to_le_bytes());
        assert!(matches!(cpu.step(), Err(Trap::EnvironmentCallFromMMode)));
    }

    #[test]
    fn x0_is_never_observably_written() {
        let inst = encode_i(99, 0, funct3::ADD_SUB, 0, opcodes::OP_IMM);
        let mut cpu = cpu_with(&inst.to_le_bytes());
        cpu.step().unwrap();
        assert_eq!(cpu.regs.read(0), 0);
    }

    #[test]
    fn misaligned_jump_target_traps() {
        let inst = encode_i(2, 0, funct3::ADD_SUB, 1, opcodes::OP_JALR);
        let mut cpu = cpu_with(&inst.to_le_bytes());
        assert!(matches!(
            cpu.step(),
            Err(Trap::InstructionAddressMisaligned(_))
        ));
    }

    #[test]
    fn trap_to_machine_mode_sets_status_bits() {
        let mut cpu = cpu_with(&privileged::ECALL.to_le_bytes());
        let pc_before = cpu.pc;
        let trap = cpu.step().unwrap_err();
        cpu.take_trap(trap, pc_before);
        assert_eq!(cpu.mode, PrivilegeMode::Machine);
        assert_eq!(cpu.csrs.read(MCAUSE), 11);
        assert_eq!(cpu.csrs.read(MEPC), pc_before);
    }
}
