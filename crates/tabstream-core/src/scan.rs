//! Structural byte search for the CSV state machine.
//!
//! The parser jumps from one interesting byte to the next instead of walking
//! byte-by-byte: delimiter/CR/LF while inside an unquoted field, the quote
//! byte while inside a quoted one. `memchr` provides the SIMD kernels
//! (SSE2/AVX2/NEON with a scalar tail), so this module only fixes the byte
//! classes.

use memchr::{memchr, memchr2, memchr3};

pub const CR: u8 = b'\r';
pub const LF: u8 = b'\n';

/// Position of the next delimiter, CR, or LF in `haystack`.
#[inline]
pub fn find_separator(haystack: &[u8], delimiter: u8) -> Option<usize> {
    memchr3(delimiter, CR, LF, haystack)
}

/// Position of the next CR or LF in `haystack`.
#[inline]
pub fn find_newline(haystack: &[u8]) -> Option<usize> {
    memchr2(CR, LF, haystack)
}

/// Position of the next occurrence of `byte` in `haystack`.
#[inline]
pub fn find_byte(haystack: &[u8], byte: u8) -> Option<usize> {
    memchr(byte, haystack)
}

#[inline]
pub fn is_newline(byte: u8) -> bool {
    byte == CR || byte == LF
}
