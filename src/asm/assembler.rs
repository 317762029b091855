//! Simple assembler for LS-8 programs.
//!
//! Syntax:
//! ```text
//! ; Comment (# also works)
//! LOOP:           ; Define a label
//!     LDI R0, 8   ; Load immediate into R0
//!     LDI R2, LOOP ; Labels resolve to byte addresses
//!     ADD R0, R1
//!     MUL         ; Always R0 * R1 -> R0
//!     JMP R2      ; Jump through a register
//!     HLT
//!
//!     DAT 42      ; Define a data byte
//! ```
//!
//! Jumps take a register operand, so a jump target label is first loaded
//! into a register with LDI, then jumped through.

use crate::cpu::decode::{encode_into, Instruction};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to a byte program.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// The assembler state.
struct Assembler {
    /// Symbol table (label -> byte address).
    symbols: HashMap<String, u8>,
    /// Pending references: (output byte index, label, source line).
    pending: Vec<(usize, String, usize)>,
    /// Output bytes.
    output: Vec<u8>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        // Pass 1: collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: resolve forward references
        self.resolve_references()?;

        Ok(self.output.clone())
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Strip comments (both ; and # styles)
        let line = line
            .split(|c| c == ';' || c == '#')
            .next()
            .unwrap_or("")
            .trim();

        if line.is_empty() {
            return Ok(());
        }

        // Check for label definition
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if !label.is_empty() {
                if self.output.len() > u8::MAX as usize {
                    return Err(AssemblerError::ProgramTooLarge { line: line_num });
                }
                self.symbols.insert(label, self.output.len() as u8);
            }

            // Process rest of line if any
            let rest = line[colon_idx + 1..].trim();
            if !rest.is_empty() {
                return self.process_instruction(rest, line_num);
            }
            return Ok(());
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((m, rest)) => (m.to_uppercase(), rest.trim()),
            None => (line.to_uppercase(), ""),
        };

        let operands: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };

        match mnemonic.as_str() {
            // Directive: define a data byte
            "DAT" | "DATA" => {
                let operand = self.expect_operand(&operands, 0, &mnemonic, line_num)?;
                let value = self.parse_value(operand, line_num)?;
                self.output.push(value);
            }

            _ => {
                let instr = self.parse_instruction(&mnemonic, &operands, line_num)?;
                encode_into(&instr, &mut self.output);
            }
        }

        Ok(())
    }

    fn parse_instruction(
        &mut self,
        mnemonic: &str,
        operands: &[&str],
        line_num: usize,
    ) -> Result<Instruction, AssemblerError> {
        let instr = match mnemonic {
            "LDI" => {
                let reg = self.parse_register(
                    self.expect_operand(operands, 0, mnemonic, line_num)?,
                    line_num,
                )?;
                // The immediate byte sits two past the opcode; record it
                // now in case it is a forward label reference.
                let operand = self.expect_operand(operands, 1, mnemonic, line_num)?;
                let value = self.parse_value_or_label(operand, self.output.len() + 2, line_num)?;
                Instruction::Ldi { reg, value }
            }
            "PRN" => {
                let reg = self.parse_register(
                    self.expect_operand(operands, 0, mnemonic, line_num)?,
                    line_num,
                )?;
                Instruction::Prn { reg }
            }
            "ADD" => {
                let reg_a = self.parse_register(
                    self.expect_operand(operands, 0, mnemonic, line_num)?,
                    line_num,
                )?;
                let reg_b = self.parse_register(
                    self.expect_operand(operands, 1, mnemonic, line_num)?,
                    line_num,
                )?;
                Instruction::Add { reg_a, reg_b }
            }
            "MUL" => Instruction::Mul,
            "CMP" => Instruction::Cmp,
            "PUSH" => {
                let reg = self.parse_register(
                    self.expect_operand(operands, 0, mnemonic, line_num)?,
                    line_num,
                )?;
                Instruction::Push { reg }
            }
            "POP" => {
                let reg = self.parse_register(
                    self.expect_operand(operands, 0, mnemonic, line_num)?,
                    line_num,
                )?;
                Instruction::Pop { reg }
            }
            "JMP" => {
                let reg = self.parse_register(
                    self.expect_operand(operands, 0, mnemonic, line_num)?,
                    line_num,
                )?;
                Instruction::Jmp { reg }
            }
            "JEQ" => {
                let reg = self.parse_register(
                    self.expect_operand(operands, 0, mnemonic, line_num)?,
                    line_num,
                )?;
                Instruction::Jeq { reg }
            }
            "JNE" => {
                let reg = self.parse_register(
                    self.expect_operand(operands, 0, mnemonic, line_num)?,
                    line_num,
                )?;
                Instruction::Jne { reg }
            }
            "HLT" | "HALT" => Instruction::Hlt,

            _ => {
                return Err(AssemblerError::UnknownMnemonic {
                    line: line_num,
                    mnemonic: mnemonic.to_string(),
                })
            }
        };

        Ok(instr)
    }

    fn expect_operand<'a>(
        &self,
        operands: &[&'a str],
        index: usize,
        mnemonic: &str,
        line_num: usize,
    ) -> Result<&'a str, AssemblerError> {
        operands
            .get(index)
            .copied()
            .ok_or_else(|| AssemblerError::SyntaxError {
                line: line_num,
                message: format!("{} requires {} operand(s)", mnemonic, index + 1),
            })
    }

    /// Parse a register operand: `R0` through `R7`.
    fn parse_register(&self, operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let upper = operand.to_uppercase();
        let index = upper
            .strip_prefix('R')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|&n| n < 8);

        index.ok_or_else(|| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("`{}` is not a register (expected R0-R7)", operand),
        })
    }

    /// Parse a numeric operand: decimal, `0x` hex, or `0b` binary.
    fn parse_value(&self, operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let operand = operand.trim();

        let parsed = if let Some(hex) = operand
            .strip_prefix("0x")
            .or_else(|| operand.strip_prefix("0X"))
        {
            u8::from_str_radix(hex, 16)
        } else if let Some(bin) = operand
            .strip_prefix("0b")
            .or_else(|| operand.strip_prefix("0B"))
        {
            u8::from_str_radix(bin, 2)
        } else {
            operand.parse::<u8>()
        };

        parsed.map_err(|_| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("`{}` is not an 8-bit value", operand),
        })
    }

    /// Parse a numeric operand, falling back to a label reference.
    /// A label emits a placeholder patched in pass 2 at `patch_index`.
    fn parse_value_or_label(
        &mut self,
        operand: &str,
        patch_index: usize,
        line_num: usize,
    ) -> Result<u8, AssemblerError> {
        if let Ok(value) = self.parse_value(operand, line_num) {
            return Ok(value);
        }

        self.pending
            .push((patch_index, operand.to_uppercase(), line_num));
        Ok(0) // Placeholder, resolved in pass 2
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (patch_index, label, line_num) in &self.pending {
            let addr = self
                .symbols
                .get(label)
                .ok_or_else(|| AssemblerError::UndefinedLabel {
                    line: *line_num,
                    label: label.clone(),
                })?;

            self.output[*patch_index] = *addr;
        }
        Ok(())
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("program exceeds 256 bytes at line {line}")]
    ProgramTooLarge { line: usize },
}
