use std::fmt;

/// A register operand.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy)]
pub enum Register {
    /// General purpose register `V0` - `VF`
    V(u8),
    /// The `I` register used for memory addressing
    Index,
    /// The delay timer `DT`
    DelayTimer,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::V(reg) => write!(f, "%v{:x}", reg),
            Register::Index => write!(f, "%index"),
            Register::DelayTimer => write!(f, "%timer"),
        }
    }
}

/// An argument to a builtin or an entry in a data block.
#[derive(Debug, Hash, Eq, PartialEq, Clone)]
pub enum Value {
    /// A reference to a label, resolved to an address after code generation.
    Identifier(String),
    Register(Register),
    Integer(u64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Identifier(name) => write!(f, "{}", name),
            Value::Register(reg) => write!(f, "{}", reg),
            Value::Integer(value) => write!(f, "{}", value),
        }
    }
}

/// A [`Value`] together with where it appears in the source.
#[derive(Debug, Hash, Eq, PartialEq, Clone)]
pub struct Atom {
    pub value: Value,
    /// Byte offset into the source
    pub offset: usize,
}

impl Atom {
    pub fn new(value: Value, offset: usize) -> Self {
        Self { value, offset }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
