use crate::lua_value::LuaValue;

/// Convert numeric text to a number the way `tonumber` does: surrounding
/// whitespace is ignored, `0x` prefixes select hexadecimal, and decimal
/// text without a fraction or exponent that fits an integer stays an
/// integer. Returns `None` when the text is not a numeral.
pub fn str_to_number(bytes: &[u8]) -> Option<LuaValue> {
    let s = std::str::from_utf8(bytes).ok()?.trim_matches(is_lua_space);
    if s.is_empty() {
        return None;
    }

    // Handle sign
    let (negative, rest) = match s.as_bytes()[0] {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    // Check for hex prefix (0x or 0X)
    if rest.starts_with("0x") || rest.starts_with("0X") {
        let hex_part = &rest[2..];

        // Hex float contains '.' or 'p'/'P' - always treat as float
        if hex_part.contains(['.', 'p', 'P']) {
            let f = parse_hex_float(hex_part)?;
            return Some(LuaValue::Float(if negative { -f } else { f }));
        }

        // Hex integers wrap around on overflow
        if hex_part.is_empty() || !hex_part.bytes().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let i = hex_part.bytes().fold(0i64, |acc, c| {
            acc.wrapping_mul(16).wrapping_add((c as char).to_digit(16).unwrap_or(0) as i64)
        });
        return Some(LuaValue::Integer(if negative { i.wrapping_neg() } else { i }));
    }

    // Decimal: digits, at most one '.', optional exponent. Rejects forms the
    // float parser would otherwise take ("inf", "nan").
    if !rest.bytes().any(|c| c.is_ascii_digit())
        || !rest
            .bytes()
            .all(|c| c.is_ascii_digit() || matches!(c, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return None;
    }

    let is_integral = !rest.contains(['.', 'e', 'E']);
    if is_integral && let Ok(i) = s.parse::<i64>() {
        return Some(LuaValue::Integer(i));
    }

    // Either has '.'/'e' or the integer parse overflowed
    s.parse::<f64>().ok().map(LuaValue::Float)
}

/// Parse `s` as an integer in `base` (2..=36), as `tonumber(s, base)` does.
pub fn str_to_int_base(bytes: &[u8], base: u32) -> Option<i64> {
    let s = std::str::from_utf8(bytes).ok()?.trim_matches(is_lua_space);
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    if digits.is_empty() {
        return None;
    }
    let mut n = 0i64;
    for c in digits.chars() {
        let d = c.to_digit(base)?;
        n = n.wrapping_mul(base as i64).wrapping_add(d as i64);
    }
    Some(if negative { n.wrapping_neg() } else { n })
}

fn is_lua_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

/// Parse hexadecimal float format (e.g., "1.8p+1" = 3.0) after the `0x`
/// prefix. Format: [integer_part][.fractional_part][p|P[+|-]exponent]
fn parse_hex_float(s: &str) -> Option<f64> {
    let (mantissa_str, exp_str) = match s.find(['p', 'P']) {
        Some(pos) => (&s[..pos], Some(&s[pos + 1..])),
        None => (s, None),
    };

    let mut mantissa = 0.0f64;
    let mut found_dot = false;
    let mut any_digit = false;
    let mut fraction_digits = 0i32;

    for ch in mantissa_str.chars() {
        if ch == '.' {
            if found_dot {
                return None; // Multiple decimal points
            }
            found_dot = true;
        } else if let Some(digit) = ch.to_digit(16) {
            mantissa = mantissa * 16.0 + digit as f64;
            any_digit = true;
            if found_dot {
                fraction_digits += 1;
            }
        } else {
            return None;
        }
    }
    if !any_digit {
        return None;
    }

    // Each hex digit after '.' scales by 1/16
    mantissa /= 16.0f64.powi(fraction_digits);

    let exponent: i32 = match exp_str {
        Some(e) => e.parse().ok()?,
        None => 0,
    };
    Some(mantissa * 2.0f64.powi(exponent))
}
