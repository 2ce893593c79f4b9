// String library
// Implements: byte, char, find, gmatch, gsub, len, lower, match, rep,
// reverse, sub, upper
//
// Strings are byte sequences; positions are 1-based, negative positions
// count from the end.

use parking_lot::Mutex;

use crate::lib_registry::{LibraryModule, check_bytes, check_integer, get_arg, opt_integer};
use crate::lua_pattern::{self, CaptureValue, GMatch, MatchInfo};
use crate::lua_value::{LuaFunction, LuaValue, MultiValue};
use crate::lua_vm::execute;
use crate::lua_vm::{LuaError, LuaResult};

/// Largest string `rep` will build
const MAX_STRING_SIZE: usize = i32::MAX as usize;

pub fn create_string_lib() -> LibraryModule {
    crate::lib_module!("string", {
        "byte" => string_byte,
        "char" => string_char,
        "len" => string_len,
        "lower" => string_lower,
        "upper" => string_upper,
        "rep" => string_rep,
        "reverse" => string_reverse,
        "sub" => string_sub,
        "find" => string_find,
        "match" => string_match,
        "gsub" => string_gsub,
        "gmatch" => string_gmatch,
    })
}

/// Start position: negative counts from the end, clamped to 1.
fn start_pos(pos: i64, len: usize) -> usize {
    let len = len as i64;
    if pos > 0 {
        pos as usize
    } else if pos == 0 || pos < -len {
        1
    } else {
        (len + pos + 1) as usize
    }
}

/// End position: negative counts from the end, clamped to `0..=len`.
fn end_pos(pos: i64, len: usize) -> usize {
    let ilen = len as i64;
    if pos > ilen {
        len
    } else if pos >= 0 {
        pos as usize
    } else if pos < -ilen {
        0
    } else {
        (ilen + pos + 1) as usize
    }
}

/// string.len(s)
fn string_len(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let s = check_bytes(args, 1, "len")?;
    Ok(MultiValue::single(LuaValue::Integer(s.len() as i64)))
}

/// string.sub(s [, i [, j]])
fn string_sub(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let s = check_bytes(args, 1, "sub")?;
    let start = start_pos(opt_integer(args, 2, "sub", 1)?, s.len());
    let end = end_pos(opt_integer(args, 3, "sub", -1)?, s.len());
    if start > end {
        return Ok(MultiValue::single(LuaValue::string("")));
    }
    Ok(MultiValue::single(LuaValue::bytes(&s[start - 1..end])))
}

/// string.upper(s) - ASCII only
fn string_upper(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let s = check_bytes(args, 1, "upper")?;
    Ok(MultiValue::single(LuaValue::bytes(&s.to_ascii_uppercase())))
}

/// string.lower(s) - ASCII only
fn string_lower(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let s = check_bytes(args, 1, "lower")?;
    Ok(MultiValue::single(LuaValue::bytes(&s.to_ascii_lowercase())))
}

/// string.rep(s, n [, sep])
fn string_rep(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let s = check_bytes(args, 1, "rep")?;
    let n = check_integer(args, 2, "rep")?;
    let sep = match get_arg(args, 3) {
        None | Some(LuaValue::Nil) => Vec::new(),
        Some(_) => check_bytes(args, 3, "rep")?,
    };
    if n <= 0 {
        return Ok(MultiValue::single(LuaValue::string("")));
    }

    let n = n as usize;
    let total = (s.len() + sep.len())
        .checked_mul(n)
        .filter(|&t| t <= MAX_STRING_SIZE)
        .ok_or_else(|| LuaError::runtime("resulting string too large"))?;

    let mut out = Vec::with_capacity(total);
    for i in 0..n {
        if i > 0 {
            out.extend_from_slice(&sep);
        }
        out.extend_from_slice(&s);
    }
    Ok(MultiValue::single(LuaValue::bytes(&out)))
}

/// string.reverse(s)
fn string_reverse(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let mut s = check_bytes(args, 1, "reverse")?;
    s.reverse();
    Ok(MultiValue::single(LuaValue::bytes(&s)))
}

/// string.byte(s [, i [, j]]) - Byte values of s[i..j]
fn string_byte(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let s = check_bytes(args, 1, "byte")?;
    let i = opt_integer(args, 2, "byte", 1)?;
    let start = start_pos(i, s.len());
    let end = end_pos(opt_integer(args, 3, "byte", i)?, s.len());
    if start > end {
        return Ok(MultiValue::empty());
    }
    let values = s[start - 1..end]
        .iter()
        .map(|&b| LuaValue::Integer(b as i64))
        .collect();
    Ok(MultiValue::multiple(values))
}

/// string.char(...) - String from byte values
fn string_char(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let mut out = Vec::with_capacity(args.len());
    for i in 1..=args.len() {
        let c = check_integer(args, i, "char")?;
        let byte = u8::try_from(c).map_err(|_| LuaError::argument(i, "char", "value out of range"))?;
        out.push(byte);
    }
    Ok(MultiValue::single(LuaValue::bytes(&out)))
}

/// Shared argument handling for find/match: subject, pattern, 0-based init.
/// `None` init means the start lies past the end of the subject.
fn pattern_args(args: &[LuaValue], func_name: &'static str) -> LuaResult<(Vec<u8>, Vec<u8>, Option<usize>)> {
    let s = check_bytes(args, 1, func_name)?;
    let pat = check_bytes(args, 2, func_name)?;
    let init = start_pos(opt_integer(args, 3, func_name, 1)?, s.len());
    let init = (init <= s.len() + 1).then_some(init - 1);
    Ok((s, pat, init))
}

/// string.find(s, pattern [, init [, plain]]) - start, end, captures...
fn string_find(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let (s, pat, init) = pattern_args(args, "find")?;
    let Some(init) = init else {
        return Ok(MultiValue::single(LuaValue::Nil));
    };
    let plain = get_arg(args, 4).is_some_and(LuaValue::is_truthy);

    if plain || lua_pattern::is_plain_pattern(&pat) {
        return Ok(match lua_pattern::find_plain(&s, &pat, init) {
            Some(pos) => MultiValue::two(
                LuaValue::Integer(pos as i64 + 1),
                LuaValue::Integer((pos + pat.len()) as i64),
            ),
            None => MultiValue::single(LuaValue::Nil),
        });
    }

    match lua_pattern::find(&s, &pat, init)? {
        Some(m) => {
            let mut values = Vec::with_capacity(2 + m.captures.len());
            values.push(LuaValue::Integer(m.start as i64 + 1));
            values.push(LuaValue::Integer(m.end as i64));
            values.extend(m.captures.iter().map(|&cap| lua_pattern::capture_to_value(&s, cap)));
            Ok(MultiValue::multiple(values))
        }
        None => Ok(MultiValue::single(LuaValue::Nil)),
    }
}

/// string.match(s, pattern [, init]) - captures, or the whole match
fn string_match(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let (s, pat, init) = pattern_args(args, "match")?;
    let Some(init) = init else {
        return Ok(MultiValue::single(LuaValue::Nil));
    };
    match lua_pattern::find(&s, &pat, init)? {
        Some(m) => Ok(MultiValue::multiple(lua_pattern::captures_to_values(&s, &m))),
        None => Ok(MultiValue::single(LuaValue::Nil)),
    }
}

/// string.gmatch(s, pattern [, init]) - iterator over successive matches
fn string_gmatch(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let s = check_bytes(args, 1, "gmatch")?;
    let pat = check_bytes(args, 2, "gmatch")?;
    let init = start_pos(opt_integer(args, 3, "gmatch", 1)?, s.len()) - 1;
    // A start past the end leaves nothing to scan
    let state = Mutex::new(GMatch::new(init.min(s.len() + 1)));

    let iter = LuaFunction::new("gmatch_iterator", move |_args| {
        let mut state = state.lock();
        match state.next_match(&s, &pat)? {
            Some(m) => Ok(MultiValue::multiple(lua_pattern::captures_to_values(&s, &m))),
            None => Ok(MultiValue::single(LuaValue::Nil)),
        }
    });
    Ok(MultiValue::single(LuaValue::Function(iter)))
}

/// string.gsub(s, pattern, repl [, n]) - Global substitution
/// `repl` may be a template string, a table or a function.
fn string_gsub(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let s = check_bytes(args, 1, "gsub")?;
    let pat = check_bytes(args, 2, "gsub")?;
    let repl = get_arg(args, 3).cloned().unwrap_or_default();
    let max = match get_arg(args, 4) {
        None | Some(LuaValue::Nil) => None,
        Some(_) => Some(check_integer(args, 4, "gsub")?.max(0) as usize),
    };

    let (out, count) = match &repl {
        LuaValue::String(_) | LuaValue::Integer(_) | LuaValue::Float(_) => {
            let template = repl.coerce_to_bytes().unwrap_or_default();
            lua_pattern::gsub(&s, &pat, max, |m| {
                lua_pattern::expand_template(&template, &s, m).map(Some)
            })?
        }
        LuaValue::Table(_) => lua_pattern::gsub(&s, &pat, max, |m| {
            let key = first_capture(&s, m);
            replacement_bytes(execute::index(&repl, &key)?)
        })?,
        LuaValue::Function(f) => lua_pattern::gsub(&s, &pat, max, |m| {
            let captures = lua_pattern::captures_to_values(&s, m);
            replacement_bytes(execute::call_function(f, &captures)?.into_first())
        })?,
        other => {
            return Err(LuaError::type_expected(3, "gsub", "string/function/table", Some(other)));
        }
    };

    Ok(MultiValue::two(LuaValue::bytes(&out), LuaValue::Integer(count as i64)))
}

/// Key used for table replacement: the first capture or the whole match.
fn first_capture(text: &[u8], m: &MatchInfo) -> LuaValue {
    match m.capture_or_whole(0) {
        Some(cap) => lua_pattern::capture_to_value(text, cap),
        None => lua_pattern::capture_to_value(text, CaptureValue::Substring(m.start, m.end)),
    }
}

/// false/nil keeps the original match; strings and numbers replace it.
fn replacement_bytes(value: LuaValue) -> LuaResult<Option<Vec<u8>>> {
    if value.is_falsy() {
        return Ok(None);
    }
    match value.coerce_to_bytes() {
        Some(bytes) => Ok(Some(bytes)),
        None => Err(LuaError::runtime(format!(
            "invalid replacement value (a {})",
            value.type_name()
        ))),
    }
}
