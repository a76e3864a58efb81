use std::collections::HashMap;

use serde_json::Value;

/// Per-call parameters merged into templates.
pub type Params = HashMap<String, Value>;

/// Exponents beyond this are left as written rather than expanded.
const MAX_EXPANDED_EXPONENT: u64 = 1024;

/// Render a value as locale-independent text.
///
/// Strings are returned verbatim, numbers in canonical decimal form, booleans
/// as `true`/`false`, `null` as `null`, and arrays/objects as compact JSON.
///
/// Numbers keep every digit of the source document. Exponent notation is
/// expanded to plain decimal.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            let text = n.to_string();
            expand_exponent(&text).unwrap_or(text)
        }
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// `1.5e3` → `1500`, `-2.5E-3` → `-0.0025`. `None` when there is no exponent
/// or it is out of range.
fn expand_exponent(number: &str) -> Option<String> {
    let (mantissa, exponent) = number.split_once(['e', 'E'])?;
    let exponent: i64 = exponent.parse().ok()?;
    if exponent.unsigned_abs() > MAX_EXPANDED_EXPONENT {
        return None;
    }
    let (negative, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, mantissa),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{int_part}{frac_part}");
    let point = i64::try_from(int_part.len()).ok()? + exponent;

    let (int_digits, frac_digits) = if point <= 0 {
        let zeros = "0".repeat(usize::try_from(-point).ok()?);
        (String::new(), format!("{zeros}{digits}"))
    } else {
        let point = usize::try_from(point).ok()?;
        if point >= digits.len() {
            let zeros = "0".repeat(point - digits.len());
            (format!("{digits}{zeros}"), String::new())
        } else {
            (digits[..point].to_owned(), digits[point..].to_owned())
        }
    };

    let int_digits = int_digits.trim_start_matches('0');
    let frac_digits = frac_digits.trim_end_matches('0');
    let mut out = String::with_capacity(int_digits.len() + frac_digits.len() + 3);
    if negative && !(int_digits.is_empty() && frac_digits.is_empty()) {
        out.push('-');
    }
    out.push_str(if int_digits.is_empty() { "0" } else { int_digits });
    if !frac_digits.is_empty() {
        out.push('.');
        out.push_str(frac_digits);
    }
    Some(out)
}
