//! Instruction decoder for the LS-8.
//!
//! Instructions are variable-length: one opcode byte followed by zero,
//! one, or two operand bytes. The two high bits of each opcode byte
//! encode its operand count, but decoding goes through an explicit
//! opcode table rather than trusting that convention.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decoded LS-8 instruction.
///
/// MUL and CMP carry no operand fields: they always consume R0 and R1
/// (a deliberate simplification of the architecture) and their two
/// operand byte positions are reserved, so they still occupy 3 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Load immediate: R[reg] := value
    Ldi { reg: u8, value: u8 },

    /// Print the decimal value of R[reg] to the output stream
    Prn { reg: u8 },

    /// Add: R[reg_a] := R[reg_a] + R[reg_b]
    Add { reg_a: u8, reg_b: u8 },

    /// Multiply: R[0] := R[0] * R[1]
    Mul,

    /// Compare R[0] with R[1], setting the condition flags
    Cmp,

    /// Push R[reg] onto the stack
    Push { reg: u8 },

    /// Pop the top of the stack into R[reg]
    Pop { reg: u8 },

    /// Unconditional jump: PC := R[reg]
    Jmp { reg: u8 },

    /// Jump if the Equal flag is set: PC := R[reg]
    Jeq { reg: u8 },

    /// Jump if the Equal flag is clear: PC := R[reg]
    Jne { reg: u8 },

    /// Halt execution
    Hlt,
}

/// Opcode byte values.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Opcode;

impl Opcode {
    pub(crate) const LDI: u8 = 0b1000_0010;
    pub(crate) const PRN: u8 = 0b0100_0111;
    pub(crate) const ADD: u8 = 0b1010_0000;
    pub(crate) const MUL: u8 = 0b1010_0010;
    pub(crate) const CMP: u8 = 0b1010_0111;
    pub(crate) const PUSH: u8 = 0b0100_0101;
    pub(crate) const POP: u8 = 0b0100_0110;
    pub(crate) const JMP: u8 = 0b0101_0100;
    pub(crate) const JEQ: u8 = 0b0101_0101;
    pub(crate) const JNE: u8 = 0b0101_0110;
    pub(crate) const HLT: u8 = 0b0000_0001;
}

impl Instruction {
    /// Total instruction length in bytes (opcode + operands).
    ///
    /// Jumps report their encoded length; whether the PC actually
    /// advances by it is the dispatcher's business.
    pub fn len(&self) -> u8 {
        match self {
            Instruction::Ldi { .. } => 3,
            Instruction::Add { .. } => 3,
            Instruction::Mul => 3,
            Instruction::Cmp => 3,
            Instruction::Prn { .. } => 2,
            Instruction::Push { .. } => 2,
            Instruction::Pop { .. } => 2,
            Instruction::Jmp { .. } => 2,
            Instruction::Jeq { .. } => 2,
            Instruction::Jne { .. } => 2,
            Instruction::Hlt => 1,
        }
    }

}

/// Decode an opcode byte and its two following bytes.
///
/// `a` and `b` are the bytes at PC+1 and PC+2; instructions with fewer
/// operands ignore the extras.
pub fn decode(opcode: u8, a: u8, b: u8) -> Result<Instruction, DecodeError> {
    let instruction = match opcode {
        Opcode::LDI => Instruction::Ldi { reg: a, value: b },
        Opcode::PRN => Instruction::Prn { reg: a },
        Opcode::ADD => Instruction::Add { reg_a: a, reg_b: b },
        Opcode::MUL => Instruction::Mul,
        Opcode::CMP => Instruction::Cmp,
        Opcode::PUSH => Instruction::Push { reg: a },
        Opcode::POP => Instruction::Pop { reg: a },
        Opcode::JMP => Instruction::Jmp { reg: a },
        Opcode::JEQ => Instruction::Jeq { reg: a },
        Opcode::JNE => Instruction::Jne { reg: a },
        Opcode::HLT => Instruction::Hlt,
        _ => return Err(DecodeError::UnknownOpcode(opcode)),
    };

    Ok(instruction)
}

/// Encode an instruction, appending its bytes to `out`.
///
/// MUL and CMP emit zeroed reserved operand bytes to keep their 3-byte
/// footprint.
pub fn encode_into(instr: &Instruction, out: &mut Vec<u8>) {
    match instr {
        Instruction::Ldi { reg, value } => out.extend([Opcode::LDI, *reg, *value]),
        Instruction::Prn { reg } => out.extend([Opcode::PRN, *reg]),
        Instruction::Add { reg_a, reg_b } => out.extend([Opcode::ADD, *reg_a, *reg_b]),
        Instruction::Mul => out.extend([Opcode::MUL, 0, 0]),
        Instruction::Cmp => out.extend([Opcode::CMP, 0, 0]),
        Instruction::Push { reg } => out.extend([Opcode::PUSH, *reg]),
        Instruction::Pop { reg } => out.extend([Opcode::POP, *reg]),
        Instruction::Jmp { reg } => out.extend([Opcode::JMP, *reg]),
        Instruction::Jeq { reg } => out.extend([Opcode::JEQ, *reg]),
        Instruction::Jne { reg } => out.extend([Opcode::JNE, *reg]),
        Instruction::Hlt => out.push(Opcode::HLT),
    }
}

/// Encode an instruction to its byte sequence.
pub fn encode(instr: &Instruction) -> Vec<u8> {
    let mut out = Vec::with_capacity(3);
    encode_into(instr, &mut out);
    out
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The fetched opcode has no registered handler.
    #[error("unknown opcode {0} (0x{0:02X} / 0b{0:08b})")]
    UnknownOpcode(u8),
}
