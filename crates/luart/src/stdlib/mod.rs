// Lua 5.1 standard library surface

pub mod basic;
pub mod bit;
pub mod coroutine;
pub mod debug;
pub mod io;
pub mod math;
pub mod os;
pub mod package;
mod sort_table;
pub mod string;
pub mod table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stdlib {
    Basic,
    Package,
    String,
    Table,
    Math,
    Bit,
    Io,
    Os,
    Coroutine,
    Debug,

    All,
}

impl Stdlib {
    /// Registry name of the library
    pub fn module_name(self) -> &'static str {
        match self {
            Stdlib::Basic => "_G",
            Stdlib::Package => "package",
            Stdlib::String => "string",
            Stdlib::Table => "table",
            Stdlib::Math => "math",
            Stdlib::Bit => "bit",
            Stdlib::Io => "io",
            Stdlib::Os => "os",
            Stdlib::Coroutine => "coroutine",
            Stdlib::Debug => "debug",
            Stdlib::All => "*",
        }
    }
}
