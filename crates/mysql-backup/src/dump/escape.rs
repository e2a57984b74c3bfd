//! Field value serialization into MySQL string literals.
//!
//! Every non-NULL value is written as a single-quoted literal, backslash
//! escaped per the MySQL string literal grammar. Binary values that are not
//! valid UTF-8 are written as hex literals so the output stays UTF-8.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::core::value::SqlValue;

/// The literal written for SQL NULL.
pub const NULL_LITERAL: &str = "NULL";

/// Serialize one value into its statement literal.
pub fn serialize(value: &SqlValue) -> String {
    let mut out = String::new();
    write_literal(&mut out, value);
    out
}

/// Append the literal for `value` to `out`.
pub fn write_literal(out: &mut String, value: &SqlValue) {
    match value {
        SqlValue::Null => out.push_str(NULL_LITERAL),
        SqlValue::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => write_quoted(out, text),
            Err(_) => write_hex(out, bytes),
        },
        other => write_quoted(out, &value_text(other)),
    }
}

/// Text rendering of a value, as MySQL would print it.
///
/// NULL renders as [`NULL_LITERAL`]; binary data that is not valid UTF-8 is
/// decoded lossily, so callers needing exact bytes must match `Bytes` first.
pub fn value_text(value: &SqlValue) -> Cow<'_, str> {
    match value {
        SqlValue::Null => Cow::Borrowed(NULL_LITERAL),
        SqlValue::Bool(b) => Cow::Borrowed(if *b { "1" } else { "0" }),
        SqlValue::Int(v) => Cow::Owned(v.to_string()),
        SqlValue::UInt(v) => Cow::Owned(v.to_string()),
        SqlValue::Float(v) => Cow::Owned(v.to_string()),
        SqlValue::Double(v) => Cow::Owned(v.to_string()),
        SqlValue::Decimal(v) => Cow::Owned(v.to_string()),
        SqlValue::Text(s) => Cow::Borrowed(s.as_str()),
        SqlValue::Bytes(b) => String::from_utf8_lossy(b),
        SqlValue::Date(d) => Cow::Owned(d.format("%Y-%m-%d").to_string()),
        SqlValue::Time(t) => Cow::Owned(t.format("%H:%M:%S%.f").to_string()),
        SqlValue::DateTime(dt) => Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
    }
}

/// Append `text` as a quoted, escaped string literal.
pub fn write_quoted(out: &mut String, text: &str) {
    out.reserve(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

fn write_hex(out: &mut String, bytes: &[u8]) {
    out.reserve(bytes.len() * 2 + 3);
    out.push_str("X'");
    for b in bytes {
        let _ = write!(out, "{:02X}", b);
    }
    out.push('\'');
}

/// Parse one single-quoted MySQL string literal back into its value.
///
/// Accepts exactly the escape sequences MySQL defines; returns `None` if
/// `literal` is not one complete quoted literal.
pub fn unescape_literal(literal: &str) -> Option<String> {
    let inner = literal.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(match chars.next()? {
                '0' => '\0',
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                'b' => '\u{8}',
                'Z' => '\u{1a}',
                other => other,
            }),
            '\'' => {
                // Only a doubled quote may appear inside the literal
                if chars.next()? != '\'' {
                    return None;
                }
                out.push('\'');
            }
            c => out.push(c),
        }
    }

    Some(out)
}
