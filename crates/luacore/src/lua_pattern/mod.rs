// Lua pattern matching, operating directly on bytes.
// Two layers: `class` for single-byte element matching, `engine` for the
// recursive matcher and the find / gmatch / gsub drivers.

mod class;
mod engine;

pub use engine::{
    CaptureResults, CaptureValue, GMatch, MatchInfo, expand_template, find, find_plain, gsub,
    is_plain_pattern,
};

use crate::lua_value::LuaValue;

/// Convert one capture to its value: a substring, or a 1-based position.
pub fn capture_to_value(text: &[u8], cap: CaptureValue) -> LuaValue {
    match cap {
        CaptureValue::Substring(start, end) => LuaValue::bytes(&text[start..end]),
        CaptureValue::Position(pos) => LuaValue::Integer(pos as i64),
    }
}

/// Values of all captures of a match; the whole match when there are none.
pub fn captures_to_values(text: &[u8], m: &MatchInfo) -> Vec<LuaValue> {
    if m.captures.is_empty() {
        return vec![LuaValue::bytes(&text[m.start..m.end])];
    }
    m.captures.iter().map(|&cap| capture_to_value(text, cap)).collect()
}
