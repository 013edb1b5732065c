//! Value codec.
//!
//! Values are stored as plain strings without any type tag. [`encode`] turns a
//! [`serde_json::Value`] into the stored text and [`decode`] guesses the original value back from
//! that text. The guess is lossy on purpose: a string such as `"true"` or `"0"` that was stored
//! verbatim comes back as a boolean or a number.
//!
//! ```
//! use gosub_storage::codec::{decode, encode};
//! use serde_json::json;
//!
//! let stored = encode(&json!({"id": 7, "tags": ["a", "b"]})).unwrap();
//! assert_eq!(decode(&stored), json!({"id": 7, "tags": ["a", "b"]}));
//!
//! // plain text is stored as-is
//! assert_eq!(encode(&json!("hello")).as_deref(), Some("hello"));
//! assert_eq!(decode("hello"), json!("hello"));
//!
//! // numeric-looking text is quoted so it survives as text...
//! assert_eq!(encode(&json!("123")).as_deref(), Some("\"123\""));
//! assert_eq!(decode("\"123\""), json!("123"));
//!
//! // ...but zero and boolean-looking text do not
//! assert_eq!(decode(&encode(&json!("0")).unwrap()), json!(0));
//! assert_eq!(decode(&encode(&json!("true")).unwrap()), json!(true));
//! ```

use regex::Regex;
use serde_json::{Number, Value};
use std::sync::LazyLock;

/// Optional `-`, digits, optional `.` and more digits. ASCII digits only.
static NUMERIC_LITERAL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+\.?[0-9]*$").ok());

/// Encodes `value` into its stored form.
///
/// Returns `None` for `null`, meaning there is no payload to store. Strings are stored verbatim
/// unless they convert to a non-zero number, in which case they are stored as quoted JSON text.
/// Everything else is stored as JSON text.
///
/// Floats in `[1e-6, 1e21)` are written in positional notation so they read back as numbers;
/// outside that range they keep exponent notation (`1e+21`) and read back as text.
pub fn encode(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if !is_truthy_number(s) => Some(s.clone()),
        Value::Number(n) if n.is_f64() => Some(encode_float(n)),
        other => Some(other.to_string()),
    }
}

fn encode_float(n: &Number) -> String {
    let Some(f) = n.as_f64() else {
        return n.to_string();
    };
    let magnitude = f.abs();
    if f == 0.0 || (1e-6..1e21).contains(&magnitude) {
        // f64 Display never uses an exponent; keep a fraction so the value stays a float
        let text = f.to_string();
        if text.contains('.') {
            text
        } else {
            text + ".0"
        }
    } else {
        let text = n.to_string();
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with(['-', '+']) => format!("{mantissa}e+{exp}"),
            _ => text,
        }
    }
}

/// How a stored string is interpreted by [`decode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawKind {
    /// Empty or the literal `null`; decodes to `null`.
    Empty,
    /// Starts with `{` or `[`; parsed as JSON.
    Structured,
    /// `true` or `false`; parsed as JSON.
    Boolean,
    /// Optional `-`, digits, optional `.` and more digits once quotes are stripped; parsed as JSON.
    Numeric,
    /// Anything else; returned verbatim.
    Text,
}

/// Classifies a stored string. Rules are checked in this order, first match wins:
///
/// 1. empty or `null`
/// 2. first character is `{` or `[`
/// 3. exactly `true` or `false`
/// 4. numeric literal after removing every `"` and `'`
/// 5. text
pub fn classify(raw: &str) -> RawKind {
    if raw.is_empty() || raw == "null" {
        RawKind::Empty
    } else if raw.starts_with('{') || raw.starts_with('[') {
        RawKind::Structured
    } else if raw == "true" || raw == "false" {
        RawKind::Boolean
    } else if looks_numeric(raw) {
        RawKind::Numeric
    } else {
        RawKind::Text
    }
}

/// Decodes a stored string into a best-guess value.
///
/// Text that looks structured but fails to parse decodes to `null`; corrupt entries read as
/// absent.
pub fn decode(raw: &str) -> Value {
    match classify(raw) {
        RawKind::Empty => Value::Null,
        RawKind::Structured | RawKind::Boolean | RawKind::Numeric => {
            serde_json::from_str(raw).unwrap_or_else(|e| {
                log::trace!("Stored value {raw:?} looked like JSON but did not parse: {e}");
                Value::Null
            })
        }
        RawKind::Text => Value::String(raw.to_owned()),
    }
}

/// Matches [`NUMERIC_LITERAL`] on `raw` with all quote characters removed.
fn looks_numeric(raw: &str) -> bool {
    match NUMERIC_LITERAL.as_ref() {
        Some(re) => re.is_match(&raw.replace(['"', '\''], "")),
        None => false,
    }
}

/// Whether a numeric conversion of `s`, following browser string-to-number rules, gives a
/// number other than zero or NaN.
fn is_truthy_number(s: &str) -> bool {
    let n = string_to_number(s);
    n != 0.0 && !n.is_nan()
}

/// Browser `Number(string)` semantics: surrounding whitespace is ignored, empty is zero,
/// `0x`/`0o`/`0b` prefixes, signed `Infinity`, decimal literals with optional exponent.
/// Anything else is NaN.
fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }

    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return parse_radix(&s[2..], radix);
    }

    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    if !is_decimal_literal(s) {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut n = 0.0_f64;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => n = n * radix as f64 + d as f64,
            None => return f64::NAN,
        }
    }
    n
}

/// `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`
fn is_decimal_literal(s: &str) -> bool {
    let b = s.as_bytes();
    let mut i = 0;
    if matches!(b.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    let mut mantissa_digits = i - int_start;

    if i < b.len() && b[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        mantissa_digits += i - frac_start;
    }
    if mantissa_digits == 0 {
        return false;
    }

    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        i += 1;
        if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == b.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trip(v: Value) -> Value {
        match encode(&v) {
            Some(raw) => decode(&raw),
            None => Value::Null,
        }
    }

    #[test]
    fn structured_values_round_trip() {
        for v in [
            json!([1, 2, 3]),
            json!({"a": 1, "b": [true, null, "x"], "c": {"d": 1.5}}),
            json!([]),
            json!({}),
            json!(true),
            json!(false),
            json!(42),
            json!(-17),
            json!(3.25),
            json!(-0.5),
            json!(0),
            json!(1e16),
            json!(123456789012345680.0),
            json!(-2.5e20),
            json!(0.000001),
            json!(7.0),
        ] {
            assert_eq!(round_trip(v.clone()), v);
        }
    }

    #[test]
    fn floats_use_positional_notation_below_1e21() {
        assert_eq!(encode(&json!(1e16)).as_deref(), Some("10000000000000000.0"));
        assert_eq!(encode(&json!(3.25)).as_deref(), Some("3.25"));
        assert_eq!(encode(&json!(0.0)).as_deref(), Some("0.0"));
        assert_eq!(encode(&json!(0.000001)).as_deref(), Some("0.000001"));
        assert_eq!(classify(&encode(&json!(1e20)).unwrap()), RawKind::Numeric);
    }

    #[test]
    fn floats_outside_positional_range_read_back_as_text() {
        assert_eq!(encode(&json!(1e21)).as_deref(), Some("1e+21"));
        assert_eq!(encode(&json!(1.5e300)).as_deref(), Some("1.5e+300"));
        assert_eq!(encode(&json!(1e-7)).as_deref(), Some("1e-7"));
        assert_eq!(round_trip(json!(1.5e300)), json!("1.5e+300"));
    }

    #[test]
    fn plain_strings_round_trip_as_strings() {
        for s in ["test", "hello world", "12abc", "-", "true story"] {
            assert_eq!(round_trip(json!(s)), json!(s));
        }
        // a lone brace looks structured and does not parse
        assert_eq!(round_trip(json!("{")), Value::Null);
    }

    #[test]
    fn non_zero_numeric_strings_keep_their_type() {
        assert_eq!(encode(&json!("123")).as_deref(), Some("\"123\""));
        assert_eq!(round_trip(json!("123")), json!("123"));
        assert_eq!(round_trip(json!("-4.5")), json!("-4.5"));
    }

    #[test]
    fn zero_boolean_and_null_strings_are_lossy() {
        assert_eq!(round_trip(json!("0")), json!(0));
        assert_eq!(round_trip(json!("true")), json!(true));
        assert_eq!(round_trip(json!("false")), json!(false));
        assert_eq!(round_trip(json!("null")), Value::Null);
        assert_eq!(round_trip(json!("")), Value::Null);
    }

    #[test]
    fn null_encodes_to_nothing() {
        assert_eq!(encode(&Value::Null), None);
    }

    #[test]
    fn classify_follows_priority_order() {
        assert_eq!(classify(""), RawKind::Empty);
        assert_eq!(classify("null"), RawKind::Empty);
        assert_eq!(classify("[1,2"), RawKind::Structured);
        assert_eq!(classify("{\"a\":1}"), RawKind::Structured);
        assert_eq!(classify("true"), RawKind::Boolean);
        assert_eq!(classify("True"), RawKind::Text);
        assert_eq!(classify("-12.5"), RawKind::Numeric);
        assert_eq!(classify("12."), RawKind::Numeric);
        assert_eq!(classify("'12'"), RawKind::Numeric);
        assert_eq!(classify("\"12\""), RawKind::Numeric);
        assert_eq!(classify(".5"), RawKind::Text);
        assert_eq!(classify("1e5"), RawKind::Text);
        assert_eq!(classify("1.2.3"), RawKind::Text);
        assert_eq!(classify("abc"), RawKind::Text);
        assert_eq!(classify("-"), RawKind::Text);
        assert_eq!(classify("1'2\"3"), RawKind::Numeric);
        // non-ASCII digits are text
        assert_eq!(classify("\u{0663}"), RawKind::Text);
    }

    #[test]
    fn corrupt_structured_text_decodes_to_null() {
        assert_eq!(decode("{not json"), Value::Null);
        assert_eq!(decode("[1,"), Value::Null);
        // numeric after stripping quotes, but the original text is not valid JSON
        assert_eq!(decode("'12'"), Value::Null);
        assert_eq!(decode("12."), Value::Null);
    }

    #[test]
    fn browser_number_conversion() {
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("   "), 0.0);
        assert_eq!(string_to_number(" 12 "), 12.0);
        assert_eq!(string_to_number("0x1f"), 31.0);
        assert_eq!(string_to_number("0b101"), 5.0);
        assert_eq!(string_to_number("0o17"), 15.0);
        assert_eq!(string_to_number("1e3"), 1000.0);
        assert_eq!(string_to_number(".5"), 0.5);
        assert_eq!(string_to_number("5."), 5.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("NaN").is_nan());
        assert!(string_to_number("0x").is_nan());
        assert!(string_to_number("-0x10").is_nan());
        assert!(string_to_number("1_000").is_nan());
        assert!(string_to_number("12px").is_nan());
    }

    #[test]
    fn numeric_looking_strings_are_quoted() {
        assert_eq!(encode(&json!("0x10")).as_deref(), Some("\"0x10\""));
        assert_eq!(encode(&json!("Infinity")).as_deref(), Some("\"Infinity\""));
        assert_eq!(encode(&json!("-0")).as_deref(), Some("-0"));
        assert_eq!(encode(&json!("NaN")).as_deref(), Some("NaN"));
    }
}
