// Standard libraries built on the runtime core

pub mod basic;
pub mod coroutine;
pub mod string;
pub mod table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stdlib {
    Basic,
    String,
    Table,
    Coroutine,

    All,
}

impl Stdlib {
    /// Name of the registry module backing this library
    pub fn module_name(self) -> &'static str {
        match self {
            Stdlib::Basic => "_G",
            Stdlib::String => "string",
            Stdlib::Table => "table",
            Stdlib::Coroutine => "coroutine",
            Stdlib::All => "",
        }
    }
}
