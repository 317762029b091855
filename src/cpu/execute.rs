//! CPU execution engine for the LS-8.
//!
//! Implements the fetch-decode-execute cycle and all instruction
//! behaviors. Each handler owns its own program-counter update:
//! fixed-length instructions advance by their encoded length, jumps
//! assign the PC directly and never auto-advance.

use crate::cpu::decode::{self, DecodeError, Instruction};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::RegisterError;
use crate::cpu::{alu, Memory, Registers};
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HLT, or not yet started).
    Halted,
    /// CPU encountered a fatal error (unknown opcode, bad register).
    Error,
}

/// The LS-8 CPU.
///
/// Owns all machine state exclusively: memory, registers, flags, PC and
/// the running state. PRN output goes to the `io::Write` sink passed to
/// [`step`](Cpu::step) and [`run`](Cpu::run), so tests can capture it.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers (general-purpose, PC, flags).
    pub regs: Registers,
    /// Main memory: instruction store, data and stack.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count (for profiling and cycle limits).
    pub cycles: u64,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU with zeroed state. The CPU starts halted; `run`
    /// (or `start`) transitions it to running.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Halted,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Reset the CPU to initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Halted;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Load a program into memory starting at address 0.
    ///
    /// Loading happens exactly once, before the first fetch; no handler
    /// ever re-invokes the loader.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(0, program)
    }

    /// Transition from halted to running. A CPU in the error state
    /// stays there; only `reset` clears it.
    pub fn start(&mut self) {
        if self.state == CpuState::Halted {
            self.state = CpuState::Running;
        }
    }

    /// Execute a single instruction, writing any PRN output to `out`.
    ///
    /// Returns the instruction that was executed, or an error. Any
    /// error leaves the CPU in the error state.
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch: opcode plus the two bytes that may be its operands.
        let pc = self.regs.pc;
        let opcode = self.mem.read(pc);
        let a = self.mem.read(pc.wrapping_add(1));
        let b = self.mem.read(pc.wrapping_add(2));

        // Decode
        let instr = match decode::decode(opcode, a, b) {
            Ok(instr) => instr,
            Err(e) => {
                self.state = CpuState::Error;
                return Err(e.into());
            }
        };

        // Execute
        if let Err(e) = self.execute(instr, out) {
            self.state = CpuState::Error;
            return Err(e);
        }

        // Update state
        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(instr)
    }

    /// Run until halt or error, writing PRN output to `out`.
    ///
    /// Returns the number of instructions executed. An infinite loop in
    /// the loaded program runs forever; use `run_limited` to cap it.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<u64, CpuError> {
        self.start();
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited<W: Write>(&mut self, max_cycles: u64, out: &mut W) -> Result<u64, CpuError> {
        self.start();
        let start_cycles = self.cycles;
        let limit = self.cycles + max_cycles;

        while self.state == CpuState::Running && self.cycles < limit {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction.
    fn execute<W: Write>(&mut self, instr: Instruction, out: &mut W) -> Result<(), CpuError> {
        match instr {
            // ==================== Data Movement ====================
            Instruction::Ldi { reg, value } => {
                self.regs.set(reg, value)?;
                self.regs.advance_pc(instr.len());
            }

            Instruction::Prn { reg } => {
                let value = self.regs.get(reg)?;
                writeln!(out, "{}", value).map_err(|e| CpuError::Output(e.to_string()))?;
                self.regs.advance_pc(instr.len());
            }

            // ==================== Arithmetic ====================
            Instruction::Add { reg_a, reg_b } => {
                let a = self.regs.get(reg_a)?;
                let b = self.regs.get(reg_b)?;
                self.regs.set(reg_a, alu::add(a, b))?;
                self.regs.advance_pc(instr.len());
            }

            Instruction::Mul => {
                // Always consumes R0 and R1, product lands in R0.
                let a = self.regs.get(0)?;
                let b = self.regs.get(1)?;
                self.regs.set(0, alu::mul(a, b))?;
                self.regs.advance_pc(instr.len());
            }

            Instruction::Cmp => {
                let a = self.regs.get(0)?;
                let b = self.regs.get(1)?;
                self.regs.flags = alu::cmp(a, b);
                self.regs.advance_pc(instr.len());
            }

            // ==================== Stack ====================
            Instruction::Push { reg } => {
                // Decrement first, then write: SP always addresses the
                // most recently pushed value.
                let value = self.regs.get(reg)?;
                let sp = self.regs.sp().wrapping_sub(1);
                self.regs.set_sp(sp);
                self.mem.write(sp, value);
                self.regs.advance_pc(instr.len());
            }

            Instruction::Pop { reg } => {
                // Read first, then increment: exact inverse of PUSH.
                let sp = self.regs.sp();
                let value = self.mem.read(sp);
                self.regs.set(reg, value)?;
                self.regs.set_sp(sp.wrapping_add(1));
                self.regs.advance_pc(instr.len());
            }

            // ==================== Control Flow ====================
            Instruction::Jmp { reg } => {
                let target = self.regs.get(reg)?;
                self.regs.jump(target);
            }

            Instruction::Jeq { reg } => {
                if self.regs.flags.equal {
                    let target = self.regs.get(reg)?;
                    self.regs.jump(target);
                } else {
                    self.regs.advance_pc(instr.len());
                }
            }

            Instruction::Jne { reg } => {
                if !self.regs.flags.equal {
                    let target = self.regs.get(reg)?;
                    self.regs.jump(target);
                } else {
                    self.regs.advance_pc(instr.len());
                }
            }

            Instruction::Hlt => {
                self.state = CpuState::Halted;
                self.regs.advance_pc(instr.len());
            }
        }

        Ok(())
    }

    /// Render a one-line trace of the CPU state: PC, the next three
    /// memory bytes, and all eight registers, in hex.
    pub fn trace(&self) -> String {
        let pc = self.regs.pc;
        let mut line = format!(
            "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
            pc,
            self.mem.read(pc),
            self.mem.read(pc.wrapping_add(1)),
            self.mem.read(pc.wrapping_add(2)),
        );

        for value in self.regs.snapshot() {
            line.push_str(&format!(" {:02X}", value));
        }

        line
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("{0}")]
    UnknownInstruction(#[from] DecodeError),

    #[error("register error: {0}")]
    InvalidRegister(#[from] RegisterError),

    #[error("output error: {0}")]
    Output(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode_into;
    use crate::cpu::registers::INITIAL_SP;

    fn make_program(instructions: &[Instruction]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for instr in instructions {
            encode_into(instr, &mut bytes);
        }
        bytes
    }

    fn run_to_halt(instructions: &[Instruction]) -> (Cpu, Vec<u8>) {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(instructions)).unwrap();
        let mut out = Vec::new();
        cpu.run(&mut out).unwrap();
        (cpu, out)
    }

    #[test]
    fn test_cpu_starts_halted() {
        let mut cpu = Cpu::new();
        let mut out = Vec::new();

        let err = cpu.step(&mut out).unwrap_err();
        assert!(matches!(err, CpuError::NotRunning(CpuState::Halted)));
    }

    #[test]
    fn test_cpu_halt() {
        let (cpu, _) = run_to_halt(&[Instruction::Hlt]);

        assert_eq!(cpu.cycles, 1);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_ldi_sets_register_and_advances_pc() {
        let (cpu, _) = run_to_halt(&[Instruction::Ldi { reg: 2, value: 0xAB }, Instruction::Hlt]);

        assert_eq!(cpu.regs.get(2).unwrap(), 0xAB);
        // LDI is 3 bytes, HLT is 1.
        assert_eq!(cpu.regs.pc, 4);
    }

    #[test]
    fn test_prn_writes_decimal_line() {
        let (_, out) = run_to_halt(&[
            Instruction::Ldi { reg: 0, value: 73 },
            Instruction::Prn { reg: 0 },
            Instruction::Hlt,
        ]);

        assert_eq!(String::from_utf8(out).unwrap(), "73\n");
    }

    #[test]
    fn test_add() {
        let (cpu, _) = run_to_halt(&[
            Instruction::Ldi { reg: 2, value: 20 },
            Instruction::Ldi { reg: 3, value: 22 },
            Instruction::Add { reg_a: 2, reg_b: 3 },
            Instruction::Hlt,
        ]);

        assert_eq!(cpu.regs.get(2).unwrap(), 42);
        assert_eq!(cpu.regs.get(3).unwrap(), 22);
    }

    #[test]
    fn test_mul_uses_r0_r1() {
        let (cpu, _) = run_to_halt(&[
            Instruction::Ldi { reg: 0, value: 6 },
            Instruction::Ldi { reg: 1, value: 7 },
            Instruction::Mul,
            Instruction::Hlt,
        ]);

        assert_eq!(cpu.regs.get(0).unwrap(), 42);
    }

    #[test]
    fn test_push_pop_round_trip() {
        let (cpu, _) = run_to_halt(&[
            Instruction::Ldi { reg: 4, value: 0xCD },
            Instruction::Push { reg: 4 },
            Instruction::Ldi { reg: 4, value: 0 },
            Instruction::Pop { reg: 4 },
            Instruction::Hlt,
        ]);

        assert_eq!(cpu.regs.get(4).unwrap(), 0xCD);
        assert_eq!(cpu.regs.sp(), INITIAL_SP);
    }

    #[test]
    fn test_stack_depth_invariant() {
        // Three pushes: SP = initial - 3, values in LIFO order below the
        // initial pointer.
        let (cpu, _) = run_to_halt(&[
            Instruction::Ldi { reg: 0, value: 11 },
            Instruction::Push { reg: 0 },
            Instruction::Ldi { reg: 0, value: 22 },
            Instruction::Push { reg: 0 },
            Instruction::Ldi { reg: 0, value: 33 },
            Instruction::Push { reg: 0 },
            Instruction::Hlt,
        ]);

        assert_eq!(cpu.regs.sp(), INITIAL_SP - 3);
        assert_eq!(cpu.mem.read(INITIAL_SP - 1), 11);
        assert_eq!(cpu.mem.read(INITIAL_SP - 2), 22);
        assert_eq!(cpu.mem.read(INITIAL_SP - 3), 33);
    }

    #[test]
    fn test_sp_addresses_top_of_stack() {
        let (cpu, _) = run_to_halt(&[
            Instruction::Ldi { reg: 0, value: 99 },
            Instruction::Push { reg: 0 },
            Instruction::Hlt,
        ]);

        assert_eq!(cpu.mem.read(cpu.regs.sp()), 99);
    }

    #[test]
    fn test_jmp() {
        // JMP over a PRN; nothing is printed.
        let (cpu, out) = run_to_halt(&[
            Instruction::Ldi { reg: 2, value: 7 }, // bytes 0-2: target = 7
            Instruction::Jmp { reg: 2 },           // bytes 3-4
            Instruction::Prn { reg: 2 },           // bytes 5-6, skipped
            Instruction::Hlt,                      // byte 7
        ]);

        assert!(out.is_empty());
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_jeq_taken_and_fall_through() {
        // R0 == R1, so JEQ jumps over the PRN.
        let (_, out) = run_to_halt(&[
            Instruction::Ldi { reg: 0, value: 5 }, // 0-2
            Instruction::Ldi { reg: 1, value: 5 }, // 3-5
            Instruction::Ldi { reg: 2, value: 16 }, // 6-8: target
            Instruction::Cmp,                      // 9-11
            Instruction::Jeq { reg: 2 },           // 12-13
            Instruction::Prn { reg: 0 },           // 14-15, skipped
            Instruction::Hlt,                      // 16
        ]);
        assert_eq!(out.len(), 0);

        // R0 != R1: JEQ falls through with PC += 2 and PRN runs.
        let (cpu, out) = run_to_halt(&[
            Instruction::Ldi { reg: 0, value: 5 }, // 0-2
            Instruction::Ldi { reg: 1, value: 6 }, // 3-5
            Instruction::Ldi { reg: 2, value: 16 }, // 6-8
            Instruction::Cmp,                      // 9-11
            Instruction::Jeq { reg: 2 },           // 12-13
            Instruction::Prn { reg: 0 },           // 14-15
            Instruction::Hlt,                      // 16
        ]);
        assert_eq!(String::from_utf8(out).unwrap(), "5\n");
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_jne_taken_and_fall_through() {
        // R0 != R1, so JNE jumps over the PRN.
        let (_, out) = run_to_halt(&[
            Instruction::Ldi { reg: 0, value: 1 }, // 0-2
            Instruction::Ldi { reg: 1, value: 2 }, // 3-5
            Instruction::Ldi { reg: 2, value: 16 }, // 6-8
            Instruction::Cmp,                      // 9-11
            Instruction::Jne { reg: 2 },           // 12-13
            Instruction::Prn { reg: 0 },           // 14-15
            Instruction::Hlt,                      // 16
        ]);
        assert_eq!(out.len(), 0);

        // R0 == R1: JNE falls through and PRN runs.
        let (_, out) = run_to_halt(&[
            Instruction::Ldi { reg: 0, value: 1 }, // 0-2
            Instruction::Ldi { reg: 1, value: 1 }, // 3-5
            Instruction::Ldi { reg: 2, value: 16 }, // 6-8
            Instruction::Cmp,                      // 9-11
            Instruction::Jne { reg: 2 },           // 12-13
            Instruction::Prn { reg: 0 },           // 14-15
            Instruction::Hlt,                      // 16
        ]);
        assert_eq!(String::from_utf8(out).unwrap(), "1\n");
    }

    #[test]
    fn test_unknown_opcode_is_fatal() {
        let mut cpu = Cpu::new();
        // Opcode 0 is a reserved value with no handler.
        cpu.load_program(&[0]).unwrap();

        let mut out = Vec::new();
        let err = cpu.run(&mut out).unwrap_err();

        assert!(matches!(
            err,
            CpuError::UnknownInstruction(DecodeError::UnknownOpcode(0))
        ));
        assert_eq!(cpu.state, CpuState::Error);
        assert_eq!(cpu.cycles, 0);

        // Execution does not continue after the failure.
        let err = cpu.step(&mut out).unwrap_err();
        assert!(matches!(err, CpuError::NotRunning(CpuState::Error)));
    }

    #[test]
    fn test_invalid_register_is_fatal() {
        let mut cpu = Cpu::new();
        // PRN with register index 9.
        cpu.load_program(&[0b0100_0111, 9]).unwrap();

        let mut out = Vec::new();
        let err = cpu.run(&mut out).unwrap_err();

        assert!(matches!(err, CpuError::InvalidRegister(_)));
        assert_eq!(cpu.state, CpuState::Error);
    }

    #[test]
    fn test_run_limited_stops_infinite_loop() {
        // JMP to self: R0 holds 3, the address of the JMP.
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[
            Instruction::Ldi { reg: 0, value: 3 },
            Instruction::Jmp { reg: 0 },
        ]))
        .unwrap();

        let mut out = Vec::new();
        let executed = cpu.run_limited(100, &mut out).unwrap();

        assert_eq!(executed, 100);
        assert!(cpu.is_running());
    }

    #[test]
    fn test_end_to_end_mul_prn() {
        // LDI 0,8 ; LDI 1,9 ; MUL ; PRN 0 ; HLT -> prints 72
        let (cpu, out) = run_to_halt(&[
            Instruction::Ldi { reg: 0, value: 8 },
            Instruction::Ldi { reg: 1, value: 9 },
            Instruction::Mul,
            Instruction::Prn { reg: 0 },
            Instruction::Hlt,
        ]);

        assert_eq!(String::from_utf8(out).unwrap(), "72\n");
        assert!(cpu.is_halted());
        assert_eq!(cpu.cycles, 5);
    }

    #[test]
    fn test_trace_format() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[Instruction::Ldi { reg: 0, value: 8 }]))
            .unwrap();

        let line = cpu.trace();
        assert!(line.starts_with("TRACE: 00 | 82 00 08 |"));
        assert!(line.ends_with("00 00 00 00 00 00 00 FF"));
    }
}
