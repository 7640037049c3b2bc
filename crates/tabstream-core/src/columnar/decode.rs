//! Strict, locale-free cell decoders over raw byte ranges.
//!
//! Every parser consumes the entire range or fails; nothing allocates.

/// Strips the ASCII whitespace set `" \t\r\n"` from both ends.
pub fn trim_cell(cell: &[u8]) -> &[u8] {
    let mut start = 0;
    let mut end = cell.len();
    while start < end && matches!(cell[start], b' ' | b'\t' | b'\r' | b'\n') {
        start += 1;
    }
    while end > start && matches!(cell[end - 1], b' ' | b'\t' | b'\r' | b'\n') {
        end -= 1;
    }
    &cell[start..end]
}

/// True if `cell` equals any configured null token byte-for-byte.
pub fn is_null_token(cell: &[u8], null_values: &[String]) -> bool {
    null_values.iter().any(|token| token.as_bytes() == cell)
}

/// Parses an optionally signed decimal i32. The accumulating absolute value
/// may reach 2^31 so that `-2147483648` round-trips; `2147483648` fails.
pub fn parse_i32(cell: &[u8]) -> Option<i32> {
    const LIMIT: i64 = 1 << 31;
    let (neg, digits) = split_sign(cell)?;
    let mut acc: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        acc = acc * 10 + i64::from(b - b'0');
        if acc > LIMIT {
            return None;
        }
    }
    let value = if neg { -acc } else { acc };
    if value < -LIMIT || value >= LIMIT {
        return None;
    }
    Some(value as i32)
}

/// Parses an optionally signed decimal i64; absolute value bounded by 2^63.
pub fn parse_i64(cell: &[u8]) -> Option<i64> {
    const LIMIT: u64 = 1 << 63;
    let (neg, digits) = split_sign(cell)?;
    let mut acc: u64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        if acc > LIMIT / 10 {
            return None;
        }
        acc = acc * 10 + u64::from(b - b'0');
        if acc > LIMIT {
            return None;
        }
    }
    if neg {
        Some((acc as i64).wrapping_neg())
    } else if acc < LIMIT {
        Some(acc as i64)
    } else {
        None
    }
}

/// Parses a strict decimal/exponent f64 covering the whole range. NaN and
/// infinities (spelled or overflowed) are rejected.
pub fn parse_f64(cell: &[u8]) -> Option<f64> {
    let text = std::str::from_utf8(cell).ok()?;
    let value: f64 = text.parse().ok()?;
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Parses `1`, `0`, or case-insensitive `true` / `false`.
pub fn parse_bool(cell: &[u8]) -> Option<bool> {
    match cell {
        b"1" => Some(true),
        b"0" => Some(false),
        _ if cell.eq_ignore_ascii_case(b"true") => Some(true),
        _ if cell.eq_ignore_ascii_case(b"false") => Some(false),
        _ => None,
    }
}

/// Splits an optional leading sign; fails on empty digit runs.
fn split_sign(cell: &[u8]) -> Option<(bool, &[u8])> {
    match cell.split_first() {
        Some((b'-', rest)) if !rest.is_empty() => Some((true, rest)),
        Some((b'+', rest)) if !rest.is_empty() => Some((false, rest)),
        Some(_) => Some((false, cell)),
        None => None,
    }
}
