//! Assembly tooling for the LS-8.
//!
//! - `image`: the `.ls8` text program-image format (loader/saver)
//! - `assembler`: two-pass mnemonic assembler
//! - `disasm`: linear-sweep disassembler

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, AssemblerError};
pub use disasm::disassemble;
pub use image::{load_image, parse_image, save_image, ImageError, ProgramImage};
