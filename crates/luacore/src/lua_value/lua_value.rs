// Discriminated value type
//
// Closed set of variants; every operation matches all of them explicitly so a
// new variant surfaces as a compile error at each dispatch site.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::{LuaFunction, LuaString, LuaTable, LuaThread};
use crate::gc::intern;

#[derive(Clone, Default)]
pub enum LuaValue {
    #[default]
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(LuaString),
    Table(LuaTable),
    Function(LuaFunction),
    Thread(LuaThread),
}

// ============ Type enum for pattern matching ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LuaValueKind {
    Nil,
    Boolean,
    Integer,
    Float,
    String,
    Table,
    Function,
    Thread,
}

impl LuaValueKind {
    /// Name reported by `type()`; integer and float are both "number".
    pub const fn name(self) -> &'static str {
        match self {
            LuaValueKind::Nil => "nil",
            LuaValueKind::Boolean => "boolean",
            LuaValueKind::Integer | LuaValueKind::Float => "number",
            LuaValueKind::String => "string",
            LuaValueKind::Table => "table",
            LuaValueKind::Function => "function",
            LuaValueKind::Thread => "thread",
        }
    }
}

impl LuaValue {
    // ============ Constructors ============

    #[inline(always)]
    pub const fn nil() -> Self {
        LuaValue::Nil
    }

    #[inline(always)]
    pub const fn boolean(b: bool) -> Self {
        LuaValue::Boolean(b)
    }

    #[inline(always)]
    pub const fn integer(i: i64) -> Self {
        LuaValue::Integer(i)
    }

    #[inline(always)]
    pub const fn float(n: f64) -> Self {
        LuaValue::Float(n)
    }

    /// String value; short strings go through the intern pool.
    #[inline]
    pub fn string(s: &str) -> Self {
        LuaValue::String(intern(s.as_bytes()))
    }

    #[inline]
    pub fn bytes(b: &[u8]) -> Self {
        LuaValue::String(intern(b))
    }

    #[inline]
    pub fn table(t: LuaTable) -> Self {
        LuaValue::Table(t)
    }

    #[inline]
    pub fn function(f: LuaFunction) -> Self {
        LuaValue::Function(f)
    }

    #[inline]
    pub fn thread(co: LuaThread) -> Self {
        LuaValue::Thread(co)
    }

    // ============ Type checks ============

    pub fn kind(&self) -> LuaValueKind {
        match self {
            LuaValue::Nil => LuaValueKind::Nil,
            LuaValue::Boolean(_) => LuaValueKind::Boolean,
            LuaValue::Integer(_) => LuaValueKind::Integer,
            LuaValue::Float(_) => LuaValueKind::Float,
            LuaValue::String(_) => LuaValueKind::String,
            LuaValue::Table(_) => LuaValueKind::Table,
            LuaValue::Function(_) => LuaValueKind::Function,
            LuaValue::Thread(_) => LuaValueKind::Thread,
        }
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        matches!(self, LuaValue::Nil)
    }

    #[inline(always)]
    pub fn is_number(&self) -> bool {
        matches!(self, LuaValue::Integer(_) | LuaValue::Float(_))
    }

    #[inline(always)]
    pub fn is_string(&self) -> bool {
        matches!(self, LuaValue::String(_))
    }

    #[inline(always)]
    pub fn is_table(&self) -> bool {
        matches!(self, LuaValue::Table(_))
    }

    #[inline(always)]
    pub fn is_function(&self) -> bool {
        matches!(self, LuaValue::Function(_))
    }

    #[inline(always)]
    pub fn is_thread(&self) -> bool {
        matches!(self, LuaValue::Thread(_))
    }

    // ============ Truthiness (Lua semantics) ============

    /// Only nil and false are falsy
    #[inline(always)]
    pub fn is_falsy(&self) -> bool {
        matches!(self, LuaValue::Nil | LuaValue::Boolean(false))
    }

    #[inline(always)]
    pub fn is_truthy(&self) -> bool {
        !self.is_falsy()
    }

    // ============ Accessors ============

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            LuaValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view: integers, and floats with an exact integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            LuaValue::Integer(i) => Some(*i),
            LuaValue::Float(f) => float_to_integer(*f),
            _ => None,
        }
    }

    pub fn as_integer_strict(&self) -> Option<i64> {
        match self {
            LuaValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            LuaValue::Integer(i) => Some(*i as f64),
            LuaValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_lua_string(&self) -> Option<&LuaString> {
        match self {
            LuaValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            LuaValue::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// `&str` view of a string value holding valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LuaValue::String(s) => s.as_str(),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&LuaTable> {
        match self {
            LuaValue::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&LuaFunction> {
        match self {
            LuaValue::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_thread(&self) -> Option<&LuaThread> {
        match self {
            LuaValue::Thread(co) => Some(co),
            _ => None,
        }
    }

    /// Text of strings and numbers (the values `..` accepts without a
    /// metamethod). Other kinds yield `None`.
    pub fn coerce_to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            LuaValue::String(s) => Some(s.as_bytes().to_vec()),
            LuaValue::Integer(i) => {
                let mut buffer = itoa::Buffer::new();
                Some(buffer.format(*i).as_bytes().to_vec())
            }
            LuaValue::Float(f) => Some(lua_float_to_string(*f).into_bytes()),
            LuaValue::Nil
            | LuaValue::Boolean(_)
            | LuaValue::Table(_)
            | LuaValue::Function(_)
            | LuaValue::Thread(_) => None,
        }
    }

    /// Identity pointer of reference kinds, used for printing and hashing.
    pub fn raw_ptr_repr(&self) -> Option<usize> {
        match self {
            LuaValue::Table(t) => Some(t.as_ptr()),
            LuaValue::Function(f) => Some(f.as_ptr()),
            LuaValue::Thread(co) => Some(co.as_ptr()),
            LuaValue::Nil
            | LuaValue::Boolean(_)
            | LuaValue::Integer(_)
            | LuaValue::Float(_)
            | LuaValue::String(_) => None,
        }
    }

    /// Primitive equality without metamethods (`rawequal`).
    /// Integers and floats compare by mathematical value.
    pub fn raw_equal(&self, other: &LuaValue) -> bool {
        match (self, other) {
            (LuaValue::Nil, LuaValue::Nil) => true,
            (LuaValue::Boolean(a), LuaValue::Boolean(b)) => a == b,
            (LuaValue::Integer(a), LuaValue::Integer(b)) => a == b,
            (LuaValue::Float(a), LuaValue::Float(b)) => a == b,
            (LuaValue::Integer(i), LuaValue::Float(f)) | (LuaValue::Float(f), LuaValue::Integer(i)) => {
                (*i as f64) == *f
            }
            (LuaValue::String(a), LuaValue::String(b)) => a == b,
            (LuaValue::Table(a), LuaValue::Table(b)) => a.ptr_eq(b),
            (LuaValue::Function(a), LuaValue::Function(b)) => a.ptr_eq(b),
            (LuaValue::Thread(a), LuaValue::Thread(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Normalize a value for use as a table key: integral floats become
    /// integers. Returns `None` for nil and NaN, which cannot be keys.
    pub fn normalize_key(&self) -> Option<LuaValue> {
        match self {
            LuaValue::Nil => None,
            LuaValue::Float(f) if f.is_nan() => None,
            LuaValue::Float(f) => Some(match float_to_integer(*f) {
                Some(i) => LuaValue::Integer(i),
                None => LuaValue::Float(*f),
            }),
            other => Some(other.clone()),
        }
    }
}

/// Exact float-to-integer conversion (no rounding).
#[inline]
pub fn float_to_integer(f: f64) -> Option<i64> {
    if !f.is_finite() || f != f.floor() {
        return None;
    }
    // i64::MIN is exactly representable as f64, i64::MAX is not
    if f < i64::MIN as f64 || f >= (i64::MAX as f64) + 1.0 {
        return None;
    }
    Some(f as i64)
}

/// Format a float the way Lua does (`%.14g`, plus `.0` when the result
/// would read back as an integer).
pub fn lua_float_to_string(f: f64) -> String {
    if f.is_nan() {
        return if f.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let mut s = format_g14(f);
    if s.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        s.push_str(".0");
    }
    s
}

/// C's `%.14g` for finite values.
fn format_g14(f: f64) -> String {
    const PRECISION: i32 = 14;
    if f == 0.0 {
        return if f.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Exponent after rounding to PRECISION significant digits
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, f);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= PRECISION {
        let mantissa = trim_fraction(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp).max(0) as usize;
        let fixed = format!("{:.*}", decimals, f);
        trim_fraction(&fixed).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

impl PartialEq for LuaValue {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.raw_equal(other)
    }
}

// Table keys are normalized (no NaN, no integral floats), so raw equality is
// an equivalence relation over every value that reaches a hash part.
impl Eq for LuaValue {}

impl Hash for LuaValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            LuaValue::Nil => state.write_u8(0),
            LuaValue::Boolean(b) => {
                state.write_u8(1);
                state.write_u8(*b as u8);
            }
            LuaValue::Integer(i) => {
                state.write_u8(2);
                state.write_i64(*i);
            }
            // Integral floats hash like the equal integer
            LuaValue::Float(f) => match float_to_integer(*f) {
                Some(i) => {
                    state.write_u8(2);
                    state.write_i64(i);
                }
                None => {
                    state.write_u8(3);
                    state.write_u64(f.to_bits());
                }
            },
            LuaValue::String(s) => {
                state.write_u8(4);
                s.hash(state);
            }
            LuaValue::Table(t) => {
                state.write_u8(5);
                state.write_usize(t.as_ptr());
            }
            LuaValue::Function(func) => {
                state.write_u8(6);
                state.write_usize(func.as_ptr());
            }
            LuaValue::Thread(co) => {
                state.write_u8(7);
                state.write_usize(co.as_ptr());
            }
        }
    }
}

impl fmt::Debug for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "nil"),
            LuaValue::Boolean(b) => write!(f, "{}", b),
            LuaValue::Integer(i) => write!(f, "{}", i),
            LuaValue::Float(n) => write!(f, "{}", lua_float_to_string(*n)),
            LuaValue::String(s) => write!(f, "{:?}", s),
            LuaValue::Table(t) => write!(f, "table(0x{:x})", t.as_ptr()),
            LuaValue::Function(func) => write!(f, "function({}, 0x{:x})", func.name(), func.as_ptr()),
            LuaValue::Thread(co) => write!(f, "thread(0x{:x})", co.as_ptr()),
        }
    }
}

/// Raw text form: numbers and strings as text, reference kinds as
/// `kind: 0xADDR`. Does not consult `__tostring`.
impl fmt::Display for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "nil"),
            LuaValue::Boolean(b) => write!(f, "{}", b),
            LuaValue::Integer(i) => {
                let mut buffer = itoa::Buffer::new();
                f.write_str(buffer.format(*i))
            }
            LuaValue::Float(n) => f.write_str(&lua_float_to_string(*n)),
            LuaValue::String(s) => write!(f, "{}", s),
            LuaValue::Table(t) => write!(f, "table: 0x{:x}", t.as_ptr()),
            LuaValue::Function(func) => write!(f, "function: 0x{:x}", func.as_ptr()),
            LuaValue::Thread(co) => write!(f, "thread: 0x{:x}", co.as_ptr()),
        }
    }
}

impl From<bool> for LuaValue {
    fn from(b: bool) -> Self {
        LuaValue::Boolean(b)
    }
}

impl From<i64> for LuaValue {
    fn from(i: i64) -> Self {
        LuaValue::Integer(i)
    }
}

impl From<f64> for LuaValue {
    fn from(n: f64) -> Self {
        LuaValue::Float(n)
    }
}

impl From<&str> for LuaValue {
    fn from(s: &str) -> Self {
        LuaValue::string(s)
    }
}

impl From<String> for LuaValue {
    fn from(s: String) -> Self {
        LuaValue::string(&s)
    }
}

impl From<LuaString> for LuaValue {
    fn from(s: LuaString) -> Self {
        LuaValue::String(s)
    }
}

impl From<LuaTable> for LuaValue {
    fn from(t: LuaTable) -> Self {
        LuaValue::Table(t)
    }
}

impl From<LuaFunction> for LuaValue {
    fn from(f: LuaFunction) -> Self {
        LuaValue::Function(f)
    }
}

impl From<LuaThread> for LuaValue {
    fn from(co: LuaThread) -> Self {
        LuaValue::Thread(co)
    }
}
