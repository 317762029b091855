//! The `.ls8` program-image format.
//!
//! A plain-text format, one instruction byte per line:
//! - Each byte is written as an 8-digit base-2 literal, e.g. `10000010`
//! - Anything after `#` on a line is a comment
//! - Blank and comment-only lines are ignored
//!
//! The loader runs exactly once, before execution starts; the engine
//! never re-reads the image mid-run.

use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// A loaded program image.
#[derive(Debug, Clone)]
pub struct ProgramImage {
    /// The raw program bytes, in load order.
    pub bytes: Vec<u8>,
    /// Original source lines (for debugging).
    pub source_lines: Vec<String>,
}

impl ProgramImage {
    /// Create a new empty image.
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            source_lines: Vec::new(),
        }
    }

    /// Add a byte with its source line.
    pub fn push(&mut self, byte: u8, source: &str) {
        self.bytes.push(byte);
        self.source_lines.push(source.to_string());
    }

    /// Get the number of bytes in the image.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Default for ProgramImage {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse image text into a program image.
pub fn parse_image(source: &str) -> Result<ProgramImage, ImageError> {
    let mut image = ProgramImage::new();

    for (line_num, line) in source.lines().enumerate() {
        let code = line.split('#').next().unwrap_or("").trim();

        if code.is_empty() {
            continue;
        }

        let byte = u8::from_str_radix(code, 2).map_err(|_| ImageError::ParseError {
            line: line_num + 1,
            message: format!("`{}` is not an 8-bit base-2 literal", code),
        })?;

        image.push(byte, line.trim());
    }

    Ok(image)
}

/// Load a program image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, ImageError> {
    let source = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ImageError::IoError(e.to_string()))?;
    parse_image(&source)
}

/// Save a program image to disk.
pub fn save_image<P: AsRef<Path>>(path: P, image: &ProgramImage) -> Result<(), ImageError> {
    let mut file =
        std::fs::File::create(path.as_ref()).map_err(|e| ImageError::IoError(e.to_string()))?;

    writeln!(file, "# LS-8 program image").map_err(|e| ImageError::IoError(e.to_string()))?;
    writeln!(file, "# {} bytes", image.len()).map_err(|e| ImageError::IoError(e.to_string()))?;
    writeln!(file).map_err(|e| ImageError::IoError(e.to_string()))?;

    for (i, byte) in image.bytes.iter().enumerate() {
        writeln!(file, "{:08b} # {:03}", byte, i).map_err(|e| ImageError::IoError(e.to_string()))?;
    }

    Ok(())
}

/// Save raw bytes directly as an image.
pub fn save_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), ImageError> {
    let image = ProgramImage {
        bytes: bytes.to_vec(),
        source_lines: bytes.iter().map(|b| format!("{:08b}", b)).collect(),
    };
    save_image(path, &image)
}

/// Errors that can occur during image operations.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image() {
        let source = "\
# mult.ls8
10000010 # LDI R0,8
00000000
00001000
00000001 # HLT
";

        let image = parse_image(source).unwrap();
        assert_eq!(image.bytes, vec![0b1000_0010, 0, 8, 1]);
    }

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let source = "\n# only a comment\n\n00000001\n";

        let image = parse_image(source).unwrap();
        assert_eq!(image.bytes, vec![1]);
    }

    #[test]
    fn test_parse_rejects_bad_literal() {
        let err = parse_image("10000010\n2bad\n").unwrap_err();
        match err {
            ImageError::ParseError { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_wide_literal() {
        // Nine digits overflow a u8.
        assert!(parse_image("100000000\n").is_err());
    }
}
