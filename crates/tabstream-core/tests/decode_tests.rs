use tabstream_core::columnar::decode::{
    is_null_token, parse_bool, parse_f64, parse_i32, parse_i64, trim_cell,
};

#[test]
fn i32_accepts_signs_and_bounds() {
    assert_eq!(parse_i32(b"0"), Some(0));
    assert_eq!(parse_i32(b"+42"), Some(42));
    assert_eq!(parse_i32(b"-17"), Some(-17));
    assert_eq!(parse_i32(b"2147483647"), Some(i32::MAX));
    assert_eq!(parse_i32(b"-2147483648"), Some(i32::MIN));
    assert_eq!(parse_i32(b"2147483648"), None);
    assert_eq!(parse_i32(b"-2147483649"), None);
}

#[test]
fn i32_rejects_junk() {
    assert_eq!(parse_i32(b""), None);
    assert_eq!(parse_i32(b"-"), None);
    assert_eq!(parse_i32(b"+"), None);
    assert_eq!(parse_i32(b"12x"), None);
    assert_eq!(parse_i32(b" 12"), None);
    assert_eq!(parse_i32(b"1.5"), None);
    assert_eq!(parse_i32(b"--4"), None);
}

#[test]
fn i64_accepts_full_range() {
    assert_eq!(parse_i64(b"9223372036854775807"), Some(i64::MAX));
    assert_eq!(parse_i64(b"-9223372036854775808"), Some(i64::MIN));
    assert_eq!(parse_i64(b"9223372036854775808"), None);
    assert_eq!(parse_i64(b"-9223372036854775809"), None);
    assert_eq!(parse_i64(b"99999999999999999999"), None);
}

#[test]
fn f64_parses_decimals_and_exponents() {
    assert_eq!(parse_f64(b"1.5"), Some(1.5));
    assert_eq!(parse_f64(b"-0.25"), Some(-0.25));
    assert_eq!(parse_f64(b"1e3"), Some(1000.0));
    assert_eq!(parse_f64(b"2.5E-2"), Some(0.025));
    assert_eq!(parse_f64(b"42"), Some(42.0));
}

#[test]
fn f64_rejects_nan_infinity_and_partial_input() {
    assert_eq!(parse_f64(b"NaN"), None);
    assert_eq!(parse_f64(b"inf"), None);
    assert_eq!(parse_f64(b"-infinity"), None);
    assert_eq!(parse_f64(b"1e9999"), None, "overflow to infinity is rejected");
    assert_eq!(parse_f64(b"1.5abc"), None);
    assert_eq!(parse_f64(b""), None);
    assert_eq!(parse_f64(b" 1.0"), None);
}

#[test]
fn bool_accepts_four_forms_case_insensitively() {
    assert_eq!(parse_bool(b"1"), Some(true));
    assert_eq!(parse_bool(b"0"), Some(false));
    assert_eq!(parse_bool(b"true"), Some(true));
    assert_eq!(parse_bool(b"TRUE"), Some(true));
    assert_eq!(parse_bool(b"False"), Some(false));
    assert_eq!(parse_bool(b"yes"), None);
    assert_eq!(parse_bool(b"10"), None);
    assert_eq!(parse_bool(b""), None);
}

#[test]
fn trim_strips_the_ascii_whitespace_set() {
    assert_eq!(trim_cell(b"  x  "), b"x");
    assert_eq!(trim_cell(b"\t a b \r\n"), b"a b");
    assert_eq!(trim_cell(b"   "), b"");
    assert_eq!(trim_cell(b""), b"");
}

#[test]
fn null_tokens_match_exactly() {
    let tokens = vec![String::new(), "null".to_owned(), "NULL".to_owned()];
    assert!(is_null_token(b"", &tokens));
    assert!(is_null_token(b"null", &tokens));
    assert!(is_null_token(b"NULL", &tokens));
    assert!(!is_null_token(b"Null", &tokens));
    assert!(!is_null_token(b"0", &tokens));
}
