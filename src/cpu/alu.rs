//! Arithmetic logic unit.
//!
//! Pure value-in/value-out operations; no CPU state is touched here.
//! Arithmetic wraps at the 8-bit boundary, matching the cell width.

use crate::cpu::registers::Flags;

/// a + b, wrapping.
#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a.wrapping_add(b)
}

/// a * b, wrapping.
#[inline]
pub fn mul(a: u8, b: u8) -> u8 {
    a.wrapping_mul(b)
}

/// Compare two values, producing a fresh set of flags with exactly one
/// condition set. Starting from cleared flags avoids the stale-flag bugs
/// a partial update would allow.
pub fn cmp(a: u8, b: u8) -> Flags {
    let mut flags = Flags::cleared();
    match a.cmp(&b) {
        std::cmp::Ordering::Equal => flags.equal = true,
        std::cmp::Ordering::Less => flags.less = true,
        std::cmp::Ordering::Greater => flags.greater = true,
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add() {
        assert_eq!(add(2, 3), 5);
        assert_eq!(add(200, 100), 44); // wraps
    }

    #[test]
    fn test_mul() {
        assert_eq!(mul(6, 7), 42);
        assert_eq!(mul(16, 16), 0); // wraps
    }

    #[test]
    fn test_cmp_equal() {
        let flags = cmp(5, 5);
        assert!(flags.equal);
        assert!(!flags.less);
        assert!(!flags.greater);
    }

    #[test]
    fn test_cmp_less() {
        let flags = cmp(3, 9);
        assert!(!flags.equal);
        assert!(flags.less);
        assert!(!flags.greater);
    }

    #[test]
    fn test_cmp_greater() {
        let flags = cmp(9, 3);
        assert!(!flags.equal);
        assert!(!flags.less);
        assert!(flags.greater);
    }

    #[test]
    fn test_cmp_clears_previous_flags() {
        // A compare result never carries state from an earlier compare.
        let first = cmp(1, 2);
        assert!(first.less);

        let second = cmp(4, 4);
        assert!(second.equal);
        assert!(!second.less);
    }
}
