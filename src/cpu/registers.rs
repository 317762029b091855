//! LS-8 CPU registers.
//!
//! The register file holds:
//! - R0-R7: eight 8-bit general-purpose registers
//! - R7 is reserved as the Stack Pointer, initialized to the top of memory
//! - PC: 8-bit program counter
//! - FL: three condition flags (Equal, Less, Greater) set by CMP

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The number of general-purpose registers.
pub const NUM_REGISTERS: usize = 8;

/// The register index reserved for the stack pointer.
pub const SP_REGISTER: u8 = 7;

/// Initial stack pointer value: the last valid memory address.
pub const INITIAL_SP: u8 = 0xFF;

/// Condition flags set by the CMP instruction.
///
/// Exactly one flag is true after a compare. JEQ/JNE consult only `equal`;
/// `less` and `greater` are produced but no jump in this instruction set
/// consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags {
    /// Set when the compared values are equal.
    pub equal: bool,
    /// Set when the first value is less than the second.
    pub less: bool,
    /// Set when the first value is greater than the second.
    pub greater: bool,
}

impl Flags {
    /// Flags with all three conditions cleared.
    pub const fn cleared() -> Self {
        Self {
            equal: false,
            less: false,
            greater: false,
        }
    }
}

/// The LS-8 register file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Registers {
    /// R0-R7 general-purpose registers. R7 is the stack pointer.
    gp: [u8; NUM_REGISTERS],

    /// Program counter: index of the next opcode to fetch.
    pub pc: u8,

    /// Condition flags. Held apart from the general-purpose slots so an
    /// ordinary register write can never corrupt them.
    pub flags: Flags,
}

impl Registers {
    /// Create a new register file: all registers zeroed except the stack
    /// pointer, which starts at the top of memory.
    pub fn new() -> Self {
        let mut gp = [0; NUM_REGISTERS];
        gp[SP_REGISTER as usize] = INITIAL_SP;
        Self {
            gp,
            pc: 0,
            flags: Flags::cleared(),
        }
    }

    /// Reset to the initial power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a general-purpose register by index.
    pub fn get(&self, index: u8) -> Result<u8, RegisterError> {
        self.gp
            .get(index as usize)
            .copied()
            .ok_or(RegisterError::OutOfRange(index))
    }

    /// Write a general-purpose register by index.
    pub fn set(&mut self, index: u8, value: u8) -> Result<(), RegisterError> {
        match self.gp.get_mut(index as usize) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RegisterError::OutOfRange(index)),
        }
    }

    /// Current stack pointer (register 7).
    #[inline]
    pub fn sp(&self) -> u8 {
        self.gp[SP_REGISTER as usize]
    }

    /// Set the stack pointer (register 7).
    #[inline]
    pub fn set_sp(&mut self, value: u8) {
        self.gp[SP_REGISTER as usize] = value;
    }

    /// Advance the program counter by an instruction length.
    /// Wraps at the end of the address space.
    pub fn advance_pc(&mut self, len: u8) {
        self.pc = self.pc.wrapping_add(len);
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: u8) {
        self.pc = addr;
    }

    /// Snapshot of all eight registers (for tracing).
    pub fn snapshot(&self) -> [u8; NUM_REGISTERS] {
        self.gp
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// Register index outside 0-7.
    #[error("register index {0} out of range (0-7)")]
    OutOfRange(u8),
}
