// Character class matching for Lua patterns
// Handles %a, %d, %l, %u, %w, %s, %p, %c, %g, %x and their uppercase inverses
// Also handles [set] matching
//
// Classes use C-locale ASCII semantics: bytes >= 0x80 belong to no class.

/// Check if a byte matches a Lua character class letter.
/// `cl` is the class letter (lowercase): 'a','c','d','g','l','p','s','u','w','x'
#[inline(always)]
pub fn match_class(c: u8, cl: u8) -> bool {
    match cl {
        b'a' => c.is_ascii_alphabetic(),
        b'c' => c.is_ascii_control(),
        b'd' => c.is_ascii_digit(),
        b'g' => c.is_ascii_graphic(),
        b'l' => c.is_ascii_lowercase(),
        b'p' => c.is_ascii_punctuation(),
        // isspace: space, \t, \n, \v, \f, \r
        b's' => matches!(c, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r'),
        b'u' => c.is_ascii_uppercase(),
        b'w' => c.is_ascii_alphanumeric(),
        b'x' => c.is_ascii_hexdigit(),
        _ => c == cl, // not a class letter, match literally
    }
}

/// Check if `cl` is a known class letter, either case (distinguishes `%a`
/// from an escaped literal like `%.`).
#[inline(always)]
fn is_class_letter(cl: u8) -> bool {
    matches!(
        cl.to_ascii_lowercase(),
        b'a' | b'c' | b'd' | b'g' | b'l' | b'p' | b's' | b'u' | b'w' | b'x'
    )
}

/// `%cl` escape: uppercase class letters invert the class.
#[inline(always)]
fn match_escape(c: u8, cl: u8) -> bool {
    if cl.is_ascii_uppercase() && is_class_letter(cl) {
        !match_class(c, cl.to_ascii_lowercase())
    } else {
        match_class(c, cl)
    }
}

/// Match a single byte against the single pattern element at `pat[pp]`.
///
/// Pattern elements:
///   - `.`        → any byte
///   - `%a`       → class (lowercase = match, uppercase = inverted)
///   - `%x` where x is not a class → literal x
///   - `[set]`    → byte set
///   - literal    → exact match
///
/// The pattern must already be validated (every `%` has an operand and
/// every `[` is closed).
pub fn singlematch(c: u8, pat: &[u8], pp: usize) -> bool {
    match pat[pp] {
        b'.' => true,
        b'%' => match_escape(c, pat[pp + 1]),
        b'[' => matchset(c, pat, pp),
        literal => c == literal,
    }
}

/// Return the pattern index after the element at `pp` (past `[]`, `%x`, `.`,
/// or a literal). Repetition suffixes are not consumed.
#[inline]
pub fn element_end(pat: &[u8], pp: usize) -> usize {
    match pat[pp] {
        b'%' => pp + 2,
        b'[' => {
            let mut i = pp + 1;
            if i < pat.len() && pat[i] == b'^' {
                i += 1;
            }
            // The first byte of a set is always a member, even ']'
            loop {
                if i >= pat.len() {
                    return pat.len();
                }
                if pat[i] == b'%' {
                    i += 1;
                }
                i += 1;
                if i >= pat.len() || pat[i] == b']' {
                    break;
                }
            }
            (i + 1).min(pat.len())
        }
        _ => pp + 1,
    }
}

/// Match byte `c` against a `[set]` starting at `pat[pp]` (pp points to `[`).
fn matchset(c: u8, pat: &[u8], pp: usize) -> bool {
    // Index of the closing ']'
    let end = element_end(pat, pp) - 1;
    let mut i = pp + 1;
    let negated = pat[i] == b'^';
    if negated {
        i += 1;
    }

    let mut matched = false;
    while i < end {
        if pat[i] == b'%' && i + 1 < end {
            if match_escape(c, pat[i + 1]) {
                matched = true;
            }
            i += 2;
        } else if i + 2 < end && pat[i + 1] == b'-' {
            // Range: a-z
            if pat[i] <= c && c <= pat[i + 2] {
                matched = true;
            }
            i += 3;
        } else {
            if c == pat[i] {
                matched = true;
            }
            i += 1;
        }
    }

    if negated { !matched } else { matched }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_class() {
        assert!(match_class(b'a', b'a'));
        assert!(match_class(b'Z', b'a'));
        assert!(!match_class(b'1', b'a'));
        assert!(match_class(b'5', b'd'));
        assert!(!match_class(b'x', b'd'));
        assert!(match_class(b' ', b's'));
        assert!(match_class(b'\t', b's'));
        assert!(!match_class(b'a', b's'));
        // Non-ASCII bytes belong to no class
        assert!(!match_class(0xe9, b'a'));
        assert!(!match_class(0xe9, b'w'));
    }

    #[test]
    fn test_singlematch_dot() {
        assert!(singlematch(b'x', b".", 0));
        assert!(singlematch(0, b".", 0));
    }

    #[test]
    fn test_singlematch_inverted_class() {
        assert!(!singlematch(b'5', b"%D", 0));
        assert!(singlematch(b'a', b"%D", 0));
    }

    #[test]
    fn test_escaped_literal() {
        assert!(singlematch(b'.', b"%.", 0));
        assert!(!singlematch(b'a', b"%.", 0));
    }

    #[test]
    fn test_singlematch_sets() {
        assert!(singlematch(b'a', b"[abc]", 0));
        assert!(!singlematch(b'd', b"[abc]", 0));
        assert!(!singlematch(b'a', b"[^abc]", 0));
        assert!(singlematch(b'm', b"[a-z]", 0));
        assert!(!singlematch(b'M', b"[a-z]", 0));
        assert!(singlematch(b'5', b"[%d_]", 0));
        assert!(singlematch(b'_', b"[%d_]", 0));
        assert!(singlematch(b'-', b"[a-]", 0));
    }

    #[test]
    fn test_element_end() {
        assert_eq!(element_end(b"a", 0), 1);
        assert_eq!(element_end(b"%d", 0), 2);
        assert_eq!(element_end(b"[abc]", 0), 5);
        assert_eq!(element_end(b"[^a-z%d]", 0), 8);
        assert_eq!(element_end(b"[]abc]x", 0), 6);
        assert_eq!(element_end(b"[%]]", 0), 4);
    }

    #[test]
    fn test_set_bracket_first() {
        assert!(singlematch(b']', b"[]abc]", 0));
        assert!(singlematch(b'a', b"[]abc]", 0));
        assert!(!singlematch(b'x', b"[]abc]", 0));
    }
}
