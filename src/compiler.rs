use std::path::PathBuf;

use anyhow::{Context, Result};

use self::lexer::source_position::SourcePosition;
use crate::{disassembler::listing, hexdump};

/// Lexes source code into a token tree.
///
/// Converts bytes into tokens. For example, the source `(= %v0 5)` is converted into the
/// following tree:
///
/// ```text
/// [
///     Token { token: List([
///         Token { token: Keyword("="), offset: 1 },
///         Token { token: Register(0), offset: 3 },
///         Token { token: Integer(5), offset: 7 },
///     ]), offset: 0 },
/// ]
/// ```
pub mod lexer;

/// Parses the token tree into an AST.
pub mod parser;

/// Lexical scopes of labels.
pub mod scope;

/// Generates machine code from an AST.
pub mod codegen;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompilerError {
    #[error("Lexer error: {0}")]
    Lex(#[from] lexer::LexError),
    #[error("Parser error: {0}")]
    Parse(#[from] parser::ParseError),
    #[error("Code generation error: {0}")]
    CodeGen(#[from] codegen::CodeGenError),
}

impl CompilerError {
    /// Byte offset in the source where the error was detected, if it is tied to one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            CompilerError::Lex(err) => Some(err.offset()),
            CompilerError::Parse(err) => Some(err.offset()),
            CompilerError::CodeGen(err) => err.offset(),
        }
    }
}

/// Utility function for generating a CHIP-8 image from source code.
///
/// The image is meant to be loaded at [`codegen::LOAD_BASE`].
#[tracing::instrument(skip(input))]
pub fn compile_code(input: &[u8]) -> Result<Vec<u8>, CompilerError> {
    let tokens = lexer::lex(input)?;
    let mut program = parser::parse(tokens)?;
    let bytes = codegen::generate(&mut program)?;
    tracing::info!("Compiled {} bytes", bytes.len());

    Ok(bytes)
}

#[derive(clap::Args, Debug)]
pub struct CompileArgs {
    #[clap(default_value = "main.lisp")]
    #[clap(help = "Source file to compile")]
    pub input: PathBuf,
    #[clap(short, long, default_value = "a.ch8")]
    #[clap(help = "Where to write the compiled image")]
    pub output: PathBuf,
    #[clap(long)]
    #[clap(help = "Print a hexdump of the image")]
    pub hexdump: bool,
    #[clap(long)]
    #[clap(help = "Print a disassembly listing of the image")]
    pub listing: bool,
}

/// Compile a source file and write the image. Nothing is written if compilation fails.
pub fn compile(args: &CompileArgs) -> Result<()> {
    let input = std::fs::read(&args.input)
        .with_context(|| format!("Unable to read {}", args.input.display()))?;

    let bytes = compile_code(&input).map_err(|err| {
        let source = String::from_utf8_lossy(&input);
        let context = match err.offset() {
            Some(offset) => format!(
                "Compilation of {}:{} failed",
                args.input.display(),
                SourcePosition::from_offset(&source, offset)
            ),
            None => format!("Compilation of {} failed", args.input.display()),
        };
        anyhow::Error::new(err).context(context)
    })?;

    if args.hexdump {
        println!("{}", hexdump::hexdump(&bytes, codegen::LOAD_BASE, 3, 16));
    }
    if args.listing {
        print!("{}", listing::generate(codegen::LOAD_BASE, &bytes));
    }

    std::fs::write(&args.output, &bytes)
        .with_context(|| format!("Unable to write {}", args.output.display()))?;
    eprintln!("Wrote {} bytes to {}", bytes.len(), args.output.display());

    Ok(())
}
