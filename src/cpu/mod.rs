//! CPU emulation for the LS-8.
//!
//! This module implements the complete LS-8 machine:
//! - 256 eight-bit memory cells (instruction store, data, stack)
//! - 8 general-purpose registers, with R7 reserved as the stack pointer
//! - Equal/Less/Greater condition flags set by CMP
//! - variable-length instruction set dispatched by a fetch-decode-execute loop

pub mod alu;
pub mod decode;
pub mod execute;
pub mod memory;
pub mod registers;

pub use decode::{DecodeError, Instruction};
pub use execute::{Cpu, CpuError, CpuState};
pub use memory::{Memory, MemoryError, MEMORY_SIZE};
pub use registers::{Flags, RegisterError, Registers};
