//! LS-8 memory subsystem.
//!
//! The LS-8 has 256 byte-addressable cells serving as both instruction
//! store and data/stack store. The stack grows downward from the top.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The number of memory cells in the LS-8.
pub const MEMORY_SIZE: usize = 256;

/// LS-8 memory: 256 eight-bit cells.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a cell by address.
    ///
    /// Addresses are `u8`, so every address is in range by construction.
    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        self.cells[addr as usize]
    }

    /// Write a cell by address.
    #[inline]
    pub fn write(&mut self, addr: u8, value: u8) {
        self.cells[addr as usize] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = 0;
        }
    }

    /// Load a program into memory starting at the given address.
    pub fn load_program(&mut self, start_addr: u8, program: &[u8]) -> Result<(), MemoryError> {
        let start = start_addr as usize;
        if start + program.len() > MEMORY_SIZE {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available: MEMORY_SIZE - start,
            });
        }

        for (i, &byte) in program.iter().enumerate() {
            self.cells[start + i] = byte;
        }

        Ok(())
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: u8, count: usize) -> Vec<(u8, u8)> {
        let end = (start as usize + count).min(MEMORY_SIZE);
        (start as usize..end)
            .map(|i| (i as u8, self.cells[i]))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only show non-zero cells
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Program is too large to fit in memory.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}
