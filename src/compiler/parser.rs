use std::str::FromStr;

use thiserror::Error;

use crate::{
    ast::{Ast, Atom, NodeId, NodeKind, Program, Register, Value},
    compiler::{
        codegen::builtins,
        lexer::{Token, TokenType},
    },
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Stray {token} at offset {offset}")]
    StrayToken { token: String, offset: usize },
    #[error("Empty list at offset {offset}")]
    EmptyList { offset: usize },
    #[error("Expected {expected}, found {found} at offset {offset}")]
    ExpectedNode {
        expected: &'static str,
        found: String,
        offset: usize,
    },
    #[error("'{form}' expects {expected} items, found {found} at offset {offset}")]
    ExpectedItems {
        form: String,
        expected: usize,
        found: usize,
        offset: usize,
    },
    #[error("'{form}' expects {expected} items, found {found} at offset {offset}")]
    UnexpectedItems {
        form: String,
        expected: usize,
        found: usize,
        offset: usize,
    },
    #[error("Expected a value, found {found} at offset {offset}")]
    ExpectedValue { found: String, offset: usize },
    #[error("Expected a statement, found {found} at offset {offset}")]
    ExpectedStatement { found: String, offset: usize },
    #[error("Unknown keyword '{keyword}' at offset {offset}")]
    UnknownKeyword { keyword: String, offset: usize },
}

impl ParseError {
    /// Byte offset in the source where the error was detected.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::StrayToken { offset, .. }
            | ParseError::EmptyList { offset }
            | ParseError::ExpectedNode { offset, .. }
            | ParseError::ExpectedItems { offset, .. }
            | ParseError::UnexpectedItems { offset, .. }
            | ParseError::ExpectedValue { offset, .. }
            | ParseError::ExpectedStatement { offset, .. }
            | ParseError::UnknownKeyword { offset, .. } => *offset,
        }
    }
}

/// Keywords of the statement grammar. Builtin operations are looked up separately.
#[derive(Debug, Eq, PartialEq, Clone, Copy, strum_macros::EnumString, strum_macros::Display)]
enum Keyword {
    /// `(def name statement)`
    #[strum(serialize = "def")]
    Def,
    /// `(data value...)`
    #[strum(serialize = "data")]
    Data,
    /// `(do statement...)`
    #[strum(serialize = "do")]
    Do,
    /// `(loop statement)`
    #[strum(serialize = "loop")]
    Loop,
}

fn arity_error(form: &str, expected: usize, found: usize, offset: usize) -> ParseError {
    if found < expected {
        ParseError::ExpectedItems {
            form: form.to_owned(),
            expected,
            found,
            offset,
        }
    } else {
        ParseError::UnexpectedItems {
            form: form.to_owned(),
            expected,
            found,
            offset,
        }
    }
}

fn check_arity(form: &str, expected: usize, found: usize, offset: usize) -> Result<(), ParseError> {
    if found == expected {
        Ok(())
    } else {
        Err(arity_error(form, expected, found, offset))
    }
}

/// Split the arguments of a fixed size form.
fn take_exact<const N: usize>(
    form: &str,
    args: Vec<Token>,
    offset: usize,
) -> Result<[Token; N], ParseError> {
    <[Token; N]>::try_from(args).map_err(|args| arity_error(form, N, args.len(), offset))
}

fn parse_value(token: Token) -> Result<Atom, ParseError> {
    let value = match token.token {
        TokenType::Integer(value) => Value::Integer(value),
        TokenType::Register(reg) => Value::Register(Register::V(reg)),
        TokenType::Index => Value::Register(Register::Index),
        TokenType::DelayTimer => Value::Register(Register::DelayTimer),
        TokenType::Identifier(name) => Value::Identifier(name),
        _ => {
            return Err(ParseError::ExpectedValue {
                found: token.describe(),
                offset: token.offset,
            })
        }
    };
    Ok(Atom::new(value, token.offset))
}

fn parse_values(tokens: Vec<Token>) -> Result<Vec<Atom>, ParseError> {
    tokens.into_iter().map(parse_value).collect()
}

/// Builds an [`Ast`] from a token tree.
#[derive(Debug, Default)]
pub struct Parser {
    ast: Ast,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// A list or a bare identifier in statement position.
    fn parse_statement(&mut self, token: Token) -> Result<NodeId, ParseError> {
        match token.token {
            TokenType::List(items) => self.parse_list(items, token.offset),
            TokenType::Identifier(name) => Ok(self
                .ast
                .push(NodeKind::UnresolvedIdentifier(name), token.offset)),
            _ => Err(ParseError::ExpectedStatement {
                found: token.describe(),
                offset: token.offset,
            }),
        }
    }

    fn parse_statements(&mut self, tokens: Vec<Token>) -> Result<Vec<NodeId>, ParseError> {
        tokens
            .into_iter()
            .map(|token| self.parse_statement(token))
            .collect()
    }

    fn parse_list(&mut self, items: Vec<Token>, offset: usize) -> Result<NodeId, ParseError> {
        let mut items = items.into_iter();
        let head = items.next().ok_or(ParseError::EmptyList { offset })?;

        match head.token {
            TokenType::Keyword(keyword) => self.parse_form(&keyword, items.collect(), offset),
            TokenType::List(_) => {
                // A list of lists is an implicit `do`
                let statements =
                    self.parse_statements(std::iter::once(head).chain(items).collect())?;
                Ok(self.ast.push(NodeKind::Sequence { statements }, offset))
            }
            _ => Err(ParseError::StrayToken {
                token: head.describe(),
                offset: head.offset,
            }),
        }
    }

    fn parse_label(&mut self, args: Vec<Token>, offset: usize) -> Result<NodeId, ParseError> {
        let [name, body] = take_exact::<2>(&Keyword::Def.to_string(), args, offset)?;

        let name = match name.token {
            TokenType::Identifier(name) => name,
            _ => {
                return Err(ParseError::ExpectedNode {
                    expected: "label name",
                    found: name.describe(),
                    offset: name.offset,
                })
            }
        };
        let body = self.parse_statement(body)?;

        Ok(self.ast.push(NodeKind::Label { name, body }, offset))
    }

    fn parse_form(
        &mut self,
        keyword: &str,
        args: Vec<Token>,
        offset: usize,
    ) -> Result<NodeId, ParseError> {
        if let Ok(keyword) = Keyword::from_str(keyword) {
            return match keyword {
                Keyword::Def => self.parse_label(args, offset),
                Keyword::Data => {
                    if args.is_empty() {
                        return Err(ParseError::ExpectedItems {
                            form: keyword.to_string(),
                            expected: 1,
                            found: 0,
                            offset,
                        });
                    }
                    let values = parse_values(args)?;
                    Ok(self.ast.push(NodeKind::Data { values }, offset))
                }
                Keyword::Do => {
                    let statements = self.parse_statements(args)?;
                    Ok(self.ast.push(NodeKind::Sequence { statements }, offset))
                }
                Keyword::Loop => {
                    let [body] = take_exact::<1>(&keyword.to_string(), args, offset)?;
                    let body = self.parse_statement(body)?;
                    Ok(self.ast.push(NodeKind::Loop { body }, offset))
                }
            };
        }

        match builtins::find(keyword) {
            Some(operation) => {
                check_arity(operation.name, operation.arity, args.len(), offset)?;
                let args = parse_values(args)?;
                Ok(self
                    .ast
                    .push(NodeKind::BuiltinCall { operation, args }, offset))
            }
            None => Err(ParseError::UnknownKeyword {
                keyword: keyword.to_owned(),
                offset,
            }),
        }
    }

    /// Parse the entire program into an AST.
    ///
    /// Only lists are accepted at the top level. They become the statements of the program body.
    #[tracing::instrument(skip_all)]
    pub fn parse_program(mut self, tokens: Vec<Token>) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        for token in tokens {
            match token.token {
                TokenType::List(items) => statements.push(self.parse_list(items, token.offset)?),
                _ => {
                    return Err(ParseError::StrayToken {
                        token: token.describe(),
                        offset: token.offset,
                    })
                }
            }
        }

        let body = self.ast.push(NodeKind::Sequence { statements }, 0);
        tracing::debug!("Parsed {} AST nodes", self.ast.len());

        Ok(Program {
            ast: self.ast,
            body,
        })
    }
}

/// Parse a token tree into a program.
pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::new().parse_program(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::lex;

    use pretty_assertions::assert_eq;

    fn parse_source(input: &str) -> Result<Program, ParseError> {
        parse(lex(input.as_bytes()).expect("lexing failed"))
    }

    #[test]
    fn test_parse_structure() -> Result<(), ParseError> {
        let program = parse_source("(def main (do (= %v0 5) main))")?;

        let mut ast = Ast::new();
        let call = ast.push(
            NodeKind::BuiltinCall {
                operation: builtins::find("=").expect("builtin"),
                args: vec![
                    Atom::new(Value::Register(Register::V(0)), 17),
                    Atom::new(Value::Integer(5), 21),
                ],
            },
            14,
        );
        let jump = ast.push(NodeKind::UnresolvedIdentifier("main".to_string()), 24);
        let sequence = ast.push(
            NodeKind::Sequence {
                statements: vec![call, jump],
            },
            10,
        );
        let label = ast.push(
            NodeKind::Label {
                name: "main".to_string(),
                body: sequence,
            },
            0,
        );
        let body = ast.push(
            NodeKind::Sequence {
                statements: vec![label],
            },
            0,
        );

        assert_eq!(program, Program { ast, body });
        Ok(())
    }

    #[test]
    fn test_parse_program() -> Result<(), ParseError> {
        let tests = vec![
            (
                "(def main (do (= %v0 5) (+ %v0 3) (draw %v0 %v0 1)))",
                "(do (def main (do (= %v0 5) (+ %v0 3) (draw %v0 %v0 1))))",
            ),
            (
                "(def main (loop (= %v0 1)))",
                "(do (def main (loop (= %v0 1))))",
            ),
            (
                "(def sprite (data 0xff 0b1 'A' main))",
                "(do (def sprite (data 255 1 65 main)))",
            ),
            (
                "(def main (do (= %index sprite) (= %timer %v3) (= %v2 %timer)))",
                "(do (def main (do (= %index sprite) (= %timer %v3) (= %v2 %timer))))",
            ),
            ("(def a (do)) (def b a)", "(do (def a (do)) (def b a))"),
            (
                "(def a ((= %v0 1) (= %v1 2)))",
                "(do (def a (do (= %v0 1) (= %v1 2))))",
            ),
            ("", "(do)"),
        ];

        for (input, expected) in tests {
            let program = parse_source(input)?;
            assert_eq!(program.ast.render(program.body), expected);
        }
        Ok(())
    }

    #[test]
    fn test_arity() {
        let tests = vec![
            (
                "(= %v0)",
                ParseError::ExpectedItems {
                    form: "=".to_string(),
                    expected: 2,
                    found: 1,
                    offset: 0,
                },
            ),
            (
                "(= %v0 1 2)",
                ParseError::UnexpectedItems {
                    form: "=".to_string(),
                    expected: 2,
                    found: 3,
                    offset: 0,
                },
            ),
            (
                "(draw %v0 %v1)",
                ParseError::ExpectedItems {
                    form: "draw".to_string(),
                    expected: 3,
                    found: 2,
                    offset: 0,
                },
            ),
            (
                "(def main)",
                ParseError::ExpectedItems {
                    form: "def".to_string(),
                    expected: 2,
                    found: 1,
                    offset: 0,
                },
            ),
            (
                "(loop (do) (do))",
                ParseError::UnexpectedItems {
                    form: "loop".to_string(),
                    expected: 1,
                    found: 2,
                    offset: 0,
                },
            ),
            (
                "(data)",
                ParseError::ExpectedItems {
                    form: "data".to_string(),
                    expected: 1,
                    found: 0,
                    offset: 0,
                },
            ),
        ];

        for (input, expected) in tests {
            assert_eq!(parse_source(input), Err(expected), "{}", input);
        }
    }

    #[test]
    fn test_parse_errors() {
        let tests = vec![
            (
                "main",
                ParseError::StrayToken {
                    token: "identifier 'main'".to_string(),
                    offset: 0,
                },
            ),
            ("(do ())", ParseError::EmptyList { offset: 4 }),
            (
                "(do (5 6))",
                ParseError::StrayToken {
                    token: "integer 5".to_string(),
                    offset: 5,
                },
            ),
            (
                "(def 5 (do))",
                ParseError::ExpectedNode {
                    expected: "label name",
                    found: "integer 5".to_string(),
                    offset: 5,
                },
            ),
            (
                "(data 1 (do))",
                ParseError::ExpectedValue {
                    found: "list".to_string(),
                    offset: 8,
                },
            ),
            (
                "(= %v0 :inline)",
                ParseError::ExpectedValue {
                    found: "metadata ':inline'".to_string(),
                    offset: 7,
                },
            ),
            (
                "(do 5)",
                ParseError::ExpectedStatement {
                    found: "integer 5".to_string(),
                    offset: 4,
                },
            ),
            (
                "(ghost %v0)",
                ParseError::UnknownKeyword {
                    keyword: "ghost".to_string(),
                    offset: 0,
                },
            ),
        ];

        for (input, expected) in tests {
            assert_eq!(parse_source(input), Err(expected), "{}", input);
        }
    }
}
