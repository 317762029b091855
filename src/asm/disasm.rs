//! Disassembler for LS-8 programs.
//!
//! Performs a linear sweep from address 0, advancing by each decoded
//! instruction's length. Bytes that decode to no instruction are
//! rendered as `DAT` so the sweep can continue past data.

use crate::cpu::decode::{decode, Instruction};

/// Disassemble a single decoded instruction to text.
pub fn format_instruction(instr: &Instruction) -> String {
    match instr {
        Instruction::Ldi { reg, value } => format!("LDI R{}, {}", reg, value),
        Instruction::Prn { reg } => format!("PRN R{}", reg),
        Instruction::Add { reg_a, reg_b } => format!("ADD R{}, R{}", reg_a, reg_b),
        Instruction::Mul => "MUL".to_string(),
        Instruction::Cmp => "CMP".to_string(),
        Instruction::Push { reg } => format!("PUSH R{}", reg),
        Instruction::Pop { reg } => format!("POP R{}", reg),
        Instruction::Jmp { reg } => format!("JMP R{}", reg),
        Instruction::Jeq { reg } => format!("JEQ R{}", reg),
        Instruction::Jne { reg } => format!("JNE R{}", reg),
        Instruction::Hlt => "HLT".to_string(),
    }
}

/// Disassemble a byte program.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; LS-8 disassembly\n\n");

    let mut addr = 0usize;
    while addr < bytes.len() {
        let opcode = bytes[addr];
        let a = bytes.get(addr + 1).copied().unwrap_or(0);
        let b = bytes.get(addr + 2).copied().unwrap_or(0);

        match decode(opcode, a, b) {
            Ok(instr) => {
                output.push_str(&format!(
                    "{:03}: {}  ; {:08b}\n",
                    addr,
                    format_instruction(&instr),
                    opcode
                ));
                addr += instr.len() as usize;
            }
            Err(_) => {
                output.push_str(&format!("{:03}: DAT {}  ; {:08b}\n", addr, opcode, opcode));
                addr += 1;
            }
        }
    }

    output
}
