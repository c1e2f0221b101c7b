//! Scalar field normalization.
//!
//! Both normalizers are total: `None` is the uniform "could not normalize"
//! signal, and no input makes them fail.

use serde_json::Value;

/// Coerce a raw price string into a number.
///
/// `None` or a non-numeric string yields `None`, never an error.
pub fn normalize_price(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok()
}

/// Title-case a free-text field such as a region name.
///
/// Empty or missing input yields `None`.
pub fn normalize_text(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(title_case(raw))
}

/// Numeric coercion for a JSON scalar: accepts numbers and numeric strings.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
/// Word boundaries fall on any non-alphabetic character, so "st-marcel"
/// becomes "St-Marcel".
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }
    out
}
