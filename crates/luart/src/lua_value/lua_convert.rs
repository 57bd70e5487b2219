// Number <-> string conversion
// Lua-compatible parsing and C printf-style float rendering (%e, %f, %g)

/// Parse a numeric string the way arithmetic coercion and `tonumber` do.
///
/// Accepts surrounding whitespace, an optional sign, decimal forms with an
/// optional fraction and exponent, and `0x` hexadecimal integers. Anything
/// else (including `inf`/`nan` spellings and trailing garbage) is rejected.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim_matches(|c: char| c.is_ascii_whitespace());
    if s.is_empty() {
        return None;
    }

    let (negative, rest) = match s.as_bytes()[0] {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        // Accumulate in f64 so long literals degrade instead of overflowing
        let value = hex
            .bytes()
            .fold(0.0f64, |acc, b| acc * 16.0 + (b as char).to_digit(16).unwrap_or(0) as f64);
        return Some(if negative { -value } else { value });
    }

    if !is_decimal_literal(rest) {
        return None;
    }
    let value: f64 = rest.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// digits [. digits] [(e|E) [+|-] digits], with at least one mantissa digit
fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut pos = 0;
    let mut mantissa_digits = 0;

    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
        mantissa_digits += 1;
    }
    if pos < bytes.len() && bytes[pos] == b'.' {
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
            mantissa_digits += 1;
        }
    }
    if mantissa_digits == 0 {
        return false;
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        pos += 1;
        if pos < bytes.len() && (bytes[pos] == b'+' || bytes[pos] == b'-') {
            pos += 1;
        }
        let exp_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == exp_start {
            return false;
        }
    }
    pos == bytes.len()
}

/// `tostring` for numbers: `%.14g`, integral values without a fraction
pub fn number_to_string(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e14 {
        let mut buffer = itoa::Buffer::new();
        let text = buffer.format(n as i64);
        if n == 0.0 && n.is_sign_negative() {
            return "-0".to_string();
        }
        return text.to_string();
    }
    format_float_g(n, 14, false, false)
}

fn non_finite(n: f64, upper: bool) -> String {
    let text = if n.is_nan() {
        "nan"
    } else if n > 0.0 {
        "inf"
    } else {
        "-inf"
    };
    if upper {
        text.to_ascii_uppercase()
    } else {
        text.to_string()
    }
}

/// `%.{prec}f`
pub fn format_float_f(n: f64, prec: usize) -> String {
    if !n.is_finite() {
        return non_finite(n, false);
    }
    format!("{:.*}", prec, n)
}

/// `%.{prec}e` / `%.{prec}E` with a signed, at least two digit exponent
pub fn format_float_e(n: f64, prec: usize, upper: bool) -> String {
    if !n.is_finite() {
        return non_finite(n, upper);
    }
    let raw = format!("{:.*e}", prec, n);
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let marker = if upper { 'E' } else { 'e' };
    format!("{mantissa}{marker}{sign}{:02}", exponent.abs())
}

/// `%.{prec}g`; `alt` keeps trailing zeros like the `#` flag
pub fn format_float_g(n: f64, prec: usize, upper: bool, alt: bool) -> String {
    if !n.is_finite() {
        return non_finite(n, upper);
    }
    let prec = prec.max(1);
    let exponent = if n == 0.0 {
        0
    } else {
        // Exponent after rounding to `prec` significant digits
        let raw = format!("{:.*e}", prec - 1, n);
        raw.split_once('e')
            .and_then(|(_, e)| e.parse::<i32>().ok())
            .unwrap_or(0)
    };

    let mut text = if exponent < -4 || exponent >= prec as i32 {
        format_float_e(n, prec - 1, upper)
    } else {
        format_float_f(n, (prec as i32 - 1 - exponent).max(0) as usize)
    };

    if !alt {
        text = strip_fraction_zeros(&text);
    }
    text
}

fn strip_fraction_zeros(text: &str) -> String {
    let (body, exp) = match text.find(['e', 'E']) {
        Some(pos) => text.split_at(pos),
        None => (text, ""),
    };
    if !body.contains('.') {
        return text.to_string();
    }
    let trimmed = body.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed}{exp}")
}
