/// Compiles Lisp-like CHIP-8 assembly to machine code.
///
/// The steps are:
/// 1. **Lexing** - converting source bytes into a token tree
/// 2. **Parsing** - converting the token tree into an AST
/// 3. **Code generation** - converting the AST into machine code in two passes
///     - Pass 1: Emit - writing instructions, recording labels and queueing label references
///     - Pass 2: Resolve - patching label references with their addresses
pub mod compiler;

/// Abstract syntax tree of a program.
pub mod ast;

/// CHIP-8 instructions emitted by the compiler.
pub mod instruction;

/// Listing of compiled images.
pub mod disassembler;

/// Hexdump utility
pub mod hexdump;

/// Tracing setup.
pub mod instrumentation;
