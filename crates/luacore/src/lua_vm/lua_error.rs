use crate::lua_value::LuaValue;

/// Runtime failure raised by core operations and library functions.
///
/// Failures propagate as ordinary `Err` values up the native call stack.
/// Only the coroutine boundary (`resume`) and `pcall` turn them back into
/// `(false, message)` result pairs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LuaError {
    /// Indexing, calling or measuring a value whose kind does not support it
    #[error("attempt to {op} a {kind} value")]
    InvalidOperand { op: &'static str, kind: &'static str },

    /// Binary operation on two incompatible operand kinds
    #[error("{}", mismatch_message(.op, .left, .right))]
    OperandMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// Nil or NaN used as a table key
    #[error("{0}")]
    InvalidKey(&'static str),

    #[error("'__index' chain too long; possible loop")]
    IndexChainTooLong,

    #[error("'__newindex' chain too long; possible loop")]
    NewIndexChainTooLong,

    #[error("stack overflow")]
    StackOverflow,

    /// Malformed pattern or replacement string
    #[error("{0}")]
    Pattern(String),

    /// Coroutine state violation
    #[error("{0}")]
    Coroutine(String),

    /// Wrong argument kind or count at a library boundary
    #[error("bad argument #{position} to '{function}' ({message})")]
    Argument {
        position: usize,
        function: &'static str,
        message: String,
    },

    /// Error value raised by user code through `error(v)`
    #[error("{}", runtime_message(.0))]
    Runtime(LuaValue),
}

fn mismatch_message(op: &str, left: &str, right: &str) -> String {
    if op == "compare" && left == right {
        format!("attempt to compare two {} values", left)
    } else {
        format!("attempt to {} {} with {}", op, left, right)
    }
}

fn runtime_message(value: &LuaValue) -> String {
    match value {
        LuaValue::String(s) => s.to_string_lossy(),
        LuaValue::Integer(_) | LuaValue::Float(_) => value.to_string(),
        LuaValue::Nil => "nil".to_string(),
        other => format!("(error object is a {} value)", other.type_name()),
    }
}

impl LuaError {
    /// Build an error carrying a plain message, as `error("msg")` would.
    pub fn runtime(message: impl AsRef<str>) -> Self {
        LuaError::Runtime(LuaValue::string(message.as_ref()))
    }

    pub fn argument(position: usize, function: &'static str, message: impl Into<String>) -> Self {
        LuaError::Argument {
            position,
            function,
            message: message.into(),
        }
    }

    /// "bad argument #n to 'f' (T expected, got U)"
    pub fn type_expected(
        position: usize,
        function: &'static str,
        expected: &str,
        got: Option<&LuaValue>,
    ) -> Self {
        let got = got.map_or("no value", |v| v.type_name());
        Self::argument(position, function, format!("{} expected, got {}", expected, got))
    }

    /// The value delivered to Lua code that catches this failure:
    /// the raised object itself for `error(v)`, the message text otherwise.
    pub fn to_value(&self) -> LuaValue {
        match self {
            LuaError::Runtime(v) => v.clone(),
            other => LuaValue::string(&other.to_string()),
        }
    }
}
