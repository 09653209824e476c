use thiserror::Error;

pub use self::token::{Token, TokenType};

/// Positions in the source code.
pub mod source_position;

/// Token definitions.
pub mod token;

// Example code:
//
// (def main
//   (do
//     (= %v0 0x05)
//     (+ %v0 'A')
//     (draw %v0 %v0 1)
//     (loop main)))
//
// '(' ')'   = nested list, the first bare word inside is a keyword
// '%'       = register, e.g. `%v0`, `%index`, `%timer`
// ':'       = metadata, e.g. `:inline`
// '\''      = character literal, e.g. `'A'`
// '0'..'9'  = integer, e.g. `12`, `0x0c`, `0b1100`, `0o14`

/// Maximum number of nested lists.
///
/// Every later stage recurses once per level, so this also bounds their stack use.
pub const MAX_DEPTH: usize = 256;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LexError {
    #[error("Unmatched '(' at offset {offset}")]
    UnmatchedParen { offset: usize },
    #[error("Unexpected ')' at offset {offset}")]
    UnexpectedClosingParen { offset: usize },
    #[error("Invalid character literal at offset {offset}")]
    InvalidCharLiteral { offset: usize },
    #[error("Invalid register '%{name}' at offset {offset}")]
    InvalidRegister { name: String, offset: usize },
    #[error("Source is not valid UTF-8 from offset {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("Malformed integer '{literal}' at offset {offset}")]
    MalformedInteger { literal: String, offset: usize },
    #[error("Lists nested deeper than {max} levels at offset {offset}")]
    NestingTooDeep { max: usize, offset: usize },
}

impl LexError {
    /// Byte offset in the source where the error was detected.
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnmatchedParen { offset }
            | LexError::UnexpectedClosingParen { offset }
            | LexError::InvalidCharLiteral { offset }
            | LexError::InvalidRegister { offset, .. }
            | LexError::InvalidUtf8 { offset }
            | LexError::MalformedInteger { offset, .. }
            | LexError::NestingTooDeep { offset, .. } => *offset,
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,   // Input string
    position: usize,  // Byte offset of the current char
    ch: Option<char>, // Current char under examination
    depth: usize,     // Number of currently open lists
}

fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || ch.is_control() || ch == '(' || ch == ')'
}

fn parse_integer(literal: &str) -> Option<u64> {
    let (digits, radix) = if let Some(digits) = literal.strip_prefix("0x") {
        (digits, 16)
    } else if let Some(digits) = literal.strip_prefix("0b") {
        (digits, 2)
    } else if let Some(digits) = literal.strip_prefix("0o") {
        (digits, 8)
    } else {
        (literal, 10)
    };

    // `from_str_radix` accepts a leading sign, which is not part of the language
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            ch: input.chars().next(),
            depth: 0,
        }
    }

    fn read_char(&mut self) {
        if let Some(ch) = self.ch {
            self.position += ch.len_utf8();
        }
        self.ch = self.input[self.position..].chars().next();
    }

    fn skip_whitespace(&mut self) {
        while self
            .ch
            .map_or(false, |ch| ch.is_whitespace() || ch.is_control())
        {
            self.read_char();
        }
    }

    /// Read until the next delimiter
    fn read_word(&mut self) -> &'a str {
        let position = self.position;
        while self.ch.map_or(false, |ch| !is_delimiter(ch)) {
            self.read_char();
        }
        &self.input[position..self.position]
    }

    fn read_integer(&mut self, offset: usize) -> Result<TokenType, LexError> {
        let literal = self.read_word();
        parse_integer(literal)
            .map(TokenType::Integer)
            .ok_or_else(|| LexError::MalformedInteger {
                literal: literal.to_owned(),
                offset,
            })
    }

    fn read_char_literal(&mut self, offset: usize) -> Result<TokenType, LexError> {
        self.read_char(); // Consume the opening quote
        let position = self.position;
        while self.ch.map_or(false, |ch| ch != '\'') {
            self.read_char();
        }
        if self.ch.is_none() {
            return Err(LexError::InvalidCharLiteral { offset });
        }
        let content = &self.input[position..self.position];
        self.read_char(); // Consume the closing quote

        if self.ch.map_or(false, |ch| !is_delimiter(ch)) {
            return Err(LexError::InvalidCharLiteral { offset });
        }

        let mut chars = content.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(TokenType::Integer(ch as u64)),
            _ => Err(LexError::InvalidCharLiteral { offset }),
        }
    }

    fn read_register(&mut self, offset: usize) -> Result<TokenType, LexError> {
        self.read_char(); // Consume the '%'
        let name = self.read_word();
        match name {
            "index" => Ok(TokenType::Index),
            "timer" => Ok(TokenType::DelayTimer),
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next(), chars.next()) {
                    (Some('v'), Some(nibble), None) if nibble.is_ascii_hexdigit() => {
                        // Infallible, a single hex digit always fits
                        Ok(TokenType::Register(nibble.to_digit(16).unwrap_or(0) as u8))
                    }
                    _ => Err(LexError::InvalidRegister {
                        name: name.to_owned(),
                        offset,
                    }),
                }
            }
        }
    }

    /// Lex tokens until the end of the current list.
    ///
    /// `open` is the offset of the opening parenthesis when lexing inside a list, or `None` at
    /// the top level.
    fn lex_tokens(&mut self, open: Option<usize>) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let offset = self.position;

            let token = match self.ch {
                None => {
                    return match open {
                        Some(open) => Err(LexError::UnmatchedParen { offset: open }),
                        None => Ok(tokens),
                    }
                }
                Some(')') => {
                    if open.is_none() {
                        return Err(LexError::UnexpectedClosingParen { offset });
                    }
                    self.read_char();
                    self.depth -= 1;
                    return Ok(tokens);
                }
                Some('(') => {
                    if self.depth >= MAX_DEPTH {
                        return Err(LexError::NestingTooDeep {
                            max: MAX_DEPTH,
                            offset,
                        });
                    }
                    self.read_char();
                    self.depth += 1;
                    TokenType::List(self.lex_tokens(Some(offset))?)
                }
                Some('\'') => self.read_char_literal(offset)?,
                Some('%') => self.read_register(offset)?,
                Some(':') => {
                    self.read_char();
                    TokenType::Metadata(self.read_word().to_owned())
                }
                Some(ch) if ch.is_ascii_digit() => self.read_integer(offset)?,
                Some(_) => {
                    let word = self.read_word().to_owned();
                    if self.depth > 0 && tokens.is_empty() {
                        TokenType::Keyword(word)
                    } else {
                        TokenType::Identifier(word)
                    }
                }
            };

            tokens.push(Token::new(token, offset));
        }
    }

    /// Lex the entire input into a token tree.
    #[tracing::instrument(skip(self))]
    pub fn lex(&mut self) -> Result<Vec<Token>, LexError> {
        let tokens = self.lex_tokens(None)?;
        tracing::debug!("Lexed {} top level tokens", tokens.len());
        Ok(tokens)
    }
}

/// Lex raw source bytes into a token tree.
#[tracing::instrument(skip(input))]
pub fn lex(input: &[u8]) -> Result<Vec<Token>, LexError> {
    let source = std::str::from_utf8(input).map_err(|err| LexError::InvalidUtf8 {
        offset: err.valid_up_to(),
    })?;
    Lexer::new(source).lex()
}
