use std::fmt;

/// TokenType defines the kinds of lexical units found in source code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenType {
    /// Decimal, `0x`, `0b` or `0o` prefixed number, or a `'c'` character literal
    Integer(u64),
    /// `%v0` - `%vf`
    Register(u8),
    /// `%index`
    Index,
    /// `%timer`
    DelayTimer,
    /// Any bare word that is not in operator position
    Identifier(String),
    /// The first bare word directly inside a list, e.g. `def` in `(def main ...)`
    Keyword(String),
    /// `:name`
    Metadata(String),
    /// A parenthesized group of tokens
    List(Vec<Token>),
}

/// Token is a lexical unit of source code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    /// Type of Token
    pub token: TokenType,
    /// Byte offset into the source where the token starts
    pub offset: usize,
}

impl Token {
    pub fn new(token: TokenType, offset: usize) -> Self {
        Self { token, offset }
    }

    /// Short description used in diagnostics.
    pub fn describe(&self) -> String {
        match &self.token {
            TokenType::Integer(value) => format!("integer {}", value),
            TokenType::Register(reg) => format!("register %v{:x}", reg),
            TokenType::Index => "register %index".to_owned(),
            TokenType::DelayTimer => "register %timer".to_owned(),
            TokenType::Identifier(name) => format!("identifier '{}'", name),
            TokenType::Keyword(name) => format!("keyword '{}'", name),
            TokenType::Metadata(name) => format!("metadata ':{}'", name),
            TokenType::List(_) => "list".to_owned(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.token {
            TokenType::Integer(value) => write!(f, "{}", value),
            TokenType::Register(reg) => write!(f, "%v{:x}", reg),
            TokenType::Index => write!(f, "%index"),
            TokenType::DelayTimer => write!(f, "%timer"),
            TokenType::Identifier(name) | TokenType::Keyword(name) => write!(f, "{}", name),
            TokenType::Metadata(name) => write!(f, ":{}", name),
            TokenType::List(tokens) => {
                write!(f, "(")?;
                for (ix, token) in tokens.iter().enumerate() {
                    if ix != 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", token)?;
                }
                write!(f, ")")
            }
        }
    }
}
