//! # LS-8 Emulator
//!
//! An emulator of the LS-8, an 8-bit educational computer: 256 bytes of
//! memory, eight general-purpose registers, a descending stack, and a
//! small variable-length instruction set with arithmetic, data movement,
//! stack, and conditional-branch instructions.

pub mod asm;
pub mod cpu;

// Re-export commonly used types
pub use asm::{assemble, disassemble, load_image, save_image, AssemblerError, ProgramImage};
pub use cpu::{Cpu, CpuError, CpuState, Flags, Instruction, Memory, Registers};
