use tabstream_core::scan::{find_byte, find_newline, find_separator};

#[test]
fn separator_scan_stops_at_delimiter_cr_or_lf() {
    assert_eq!(find_separator(b"abc,def", b','), Some(3));
    assert_eq!(find_separator(b"abc\rdef", b','), Some(3));
    assert_eq!(find_separator(b"abc\ndef", b','), Some(3));
    assert_eq!(find_separator(b"abcdef", b','), None);
    assert_eq!(find_separator(b"", b','), None);
}

#[test]
fn separator_scan_honours_custom_delimiter() {
    assert_eq!(find_separator(b"a,b;c", b';'), Some(3));
    assert_eq!(find_separator(b"a\tb", b'\t'), Some(1));
}

#[test]
fn newline_scan_finds_first_terminator() {
    assert_eq!(find_newline(b"ab\r\ncd"), Some(2));
    assert_eq!(find_newline(b"abcd\n"), Some(4));
    assert_eq!(find_newline(b"abcd"), None);
}

#[test]
fn byte_scan_finds_quotes_past_simd_width() {
    // Put the hit beyond one 32-byte SIMD lane to cover the vector path.
    let mut haystack = vec![b'x'; 100];
    haystack[67] = b'"';
    assert_eq!(find_byte(&haystack, b'"'), Some(67));
    assert_eq!(find_byte(b"plain", b'"'), None);
}

#[test]
fn scans_report_first_hit_only() {
    assert_eq!(find_separator(b",,", b','), Some(0));
    assert_eq!(find_byte(b"\"\"", b'"'), Some(0));
}
