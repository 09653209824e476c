use thiserror::Error;

use self::rom::Rom;
use crate::{
    ast::{Ast, Atom, NodeId, NodeKind, Program, Register, Value},
    compiler::scope::{ScopeId, ScopeTree},
    instruction::{Instruction, JUMP_TAG, LOAD_INDEX_TAG},
};

/// Encoders for the builtin operations.
pub mod builtins;

/// The output buffer.
pub mod rom;

/// Address where the image is loaded on the CHIP-8.
pub const LOAD_BASE: u16 = 0x200;

/// Highest address reachable by a 12-bit address field.
pub const MAX_ADDRESS: usize = 0xfff;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodeGenError {
    #[error("Label '{name}' already defined in this scope, at offset {offset}")]
    DuplicateLabel { name: String, offset: usize },
    #[error("Unknown identifier '{name}' at offset {offset}")]
    UnknownIdentifier { name: String, offset: usize },
    #[error("Register {register} found in data block at offset {offset}")]
    RegisterFoundInDataBlock { register: Register, offset: usize },
    #[error("Address {address:#05x} out of range at offset {offset}")]
    AddressOutOfRange { address: usize, offset: usize },
    #[error("Integer {value} larger than {max} at offset {offset}")]
    IntegerTooLarge { value: u64, max: u64, offset: usize },
    #[error("Invalid arguments '{args}' for '{operation}' at offset {offset}")]
    InvalidArgument {
        operation: &'static str,
        args: String,
        offset: usize,
    },
    #[error("Program larger than {capacity} bytes")]
    RomOverflow { capacity: usize },
}

impl CodeGenError {
    /// Byte offset in the source where the error was detected, if it is tied to one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            CodeGenError::DuplicateLabel { offset, .. }
            | CodeGenError::UnknownIdentifier { offset, .. }
            | CodeGenError::RegisterFoundInDataBlock { offset, .. }
            | CodeGenError::AddressOutOfRange { offset, .. }
            | CodeGenError::IntegerTooLarge { offset, .. }
            | CodeGenError::InvalidArgument { offset, .. } => Some(*offset),
            CodeGenError::RomOverflow { .. } => None,
        }
    }
}

/// How a resolved label address is written into its placeholder.
#[derive(Debug, Eq, PartialEq, Clone, Copy, strum_macros::Display)]
pub enum AddressKind {
    /// The plain address, from an identifier in a data block
    Data,
    /// `1NNN`, a bare identifier used as a statement
    Call,
    /// `ANNN`, `(= %index label)`
    IndexLoad,
}

impl AddressKind {
    fn patch(&self, address: u16) -> u16 {
        match self {
            AddressKind::Data => address,
            AddressKind::Call => JUMP_TAG | address,
            AddressKind::IndexLoad => LOAD_INDEX_TAG | address,
        }
    }
}

/// A reference to a label whose address is not known until every label has been visited.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct UnresolvedAddress {
    /// Offset of the two byte placeholder in the output
    pub output_offset: usize,
    pub identifier: String,
    pub kind: AddressKind,
    /// Scope that was active when the reference was emitted
    pub scope: ScopeId,
    /// Byte offset into the source
    pub offset: usize,
}

/// Where in the program a statement is emitted.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct CallSite {
    pub scope: ScopeId,
    /// Byte offset into the source
    pub offset: usize,
}

/// Translate an offset into the output to the absolute address it is loaded at.
fn address_of(output_offset: usize, offset: usize) -> Result<u16, CodeGenError> {
    let address = output_offset + LOAD_BASE as usize;
    if address > MAX_ADDRESS {
        return Err(CodeGenError::AddressOutOfRange { address, offset });
    }
    Ok(address as u16)
}

/// Code generator state for a single compilation.
///
/// Code is generated in two passes:
/// 1. **Emit** - walk the AST once, writing instructions and data. References to labels are
///    written as zero placeholders and queued as [`UnresolvedAddress`]es.
/// 2. **Resolve** - look up every queued reference in the scope tree and patch its placeholder.
#[derive(Debug, Default)]
pub struct CodeGen {
    rom: Rom,
    scopes: ScopeTree,
    unresolved: Vec<UnresolvedAddress>,
}

impl CodeGen {
    pub fn new() -> CodeGen {
        CodeGen::default()
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    pub fn unresolved(&self) -> &[UnresolvedAddress] {
        &self.unresolved
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.rom.as_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.rom.into_bytes()
    }

    /// Append a machine word.
    pub fn write(&mut self, word: u16) -> Result<(), CodeGenError> {
        self.rom.push_word(word)
    }

    /// Append a placeholder for the address of `identifier` and queue it for resolving.
    pub fn defer(
        &mut self,
        identifier: &str,
        kind: AddressKind,
        site: CallSite,
    ) -> Result<(), CodeGenError> {
        let output_offset = self.rom.len();
        self.rom.push_word(0x0000)?;
        self.unresolved.push(UnresolvedAddress {
            output_offset,
            identifier: identifier.to_owned(),
            kind,
            scope: site.scope,
            offset: site.offset,
        });
        Ok(())
    }

    fn emit_label(
        &mut self,
        ast: &mut Ast,
        label: NodeId,
        body: NodeId,
        scope: ScopeId,
    ) -> Result<(), CodeGenError> {
        let child = self.scopes.new_child(scope, label);
        self.scopes.register_label(scope, label, ast)?;
        tracing::trace!(
            "Label '{}' at {:#06x}",
            ast.label_name(label).unwrap_or_default(),
            self.rom.len()
        );
        self.emit_node(ast, body, child)
    }

    fn emit_loop(
        &mut self,
        ast: &mut Ast,
        body: NodeId,
        site: CallSite,
    ) -> Result<(), CodeGenError> {
        let start = self.rom.len();
        self.emit_node(ast, body, site.scope)?;
        let target = address_of(start, site.offset)?;
        self.write(Instruction::Jump(target).encode())
    }

    fn emit_data(&mut self, values: &[Atom], site: CallSite) -> Result<(), CodeGenError> {
        for atom in values {
            match &atom.value {
                Value::Integer(value) => {
                    let byte = u8::try_from(*value).map_err(|_| CodeGenError::IntegerTooLarge {
                        value: *value,
                        max: u8::MAX as u64,
                        offset: atom.offset,
                    })?;
                    self.rom.push_byte(byte)?;
                }
                Value::Identifier(name) => {
                    let site = CallSite {
                        offset: atom.offset,
                        ..site
                    };
                    self.defer(name, AddressKind::Data, site)?;
                }
                Value::Register(register) => {
                    return Err(CodeGenError::RegisterFoundInDataBlock {
                        register: *register,
                        offset: atom.offset,
                    })
                }
            }
        }
        Ok(())
    }

    fn emit_node(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        scope: ScopeId,
    ) -> Result<(), CodeGenError> {
        ast[id].output_offset = Some(self.rom.len());
        let site = CallSite {
            scope,
            offset: ast[id].offset,
        };

        match ast[id].kind {
            NodeKind::Label { body, .. } => self.emit_label(ast, id, body, scope),
            NodeKind::Sequence { ref statements } => {
                for statement in statements.clone() {
                    self.emit_node(ast, statement, scope)?;
                }
                Ok(())
            }
            NodeKind::Loop { body } => self.emit_loop(ast, body, site),
            NodeKind::Data { ref values } => self.emit_data(values, site),
            NodeKind::UnresolvedIdentifier(ref name) => self.defer(name, AddressKind::Call, site),
            NodeKind::BuiltinCall {
                operation,
                ref args,
            } => (operation.encode)(self, site, args),
        }
    }

    /// Pass 1: emit the program, queueing label references.
    #[tracing::instrument(skip_all)]
    pub fn emit(&mut self, program: &mut Program) -> Result<(), CodeGenError> {
        let root = self.scopes.root();
        self.emit_node(&mut program.ast, program.body, root)?;
        tracing::debug!(
            "Emitted {} bytes, {} scopes, {} unresolved addresses",
            self.rom.len(),
            self.scopes.len(),
            self.unresolved.len()
        );
        Ok(())
    }

    /// Pass 2: resolve every queued reference and patch its placeholder.
    ///
    /// Nothing is patched unless every reference resolves.
    #[tracing::instrument(skip_all)]
    pub fn resolve(&mut self, ast: &Ast) -> Result<(), CodeGenError> {
        let unresolved = std::mem::take(&mut self.unresolved);
        let mut patches = Vec::with_capacity(unresolved.len());

        for address in &unresolved {
            let unknown = || CodeGenError::UnknownIdentifier {
                name: address.identifier.clone(),
                offset: address.offset,
            };
            let label = self
                .scopes
                .resolve(address.scope, &address.identifier, ast)
                .ok_or_else(unknown)?;
            // Labels are registered when visited, so the offset is always set here
            let label_offset = ast[label].output_offset.ok_or_else(unknown)?;
            let word = address.kind.patch(address_of(label_offset, address.offset)?);

            tracing::trace!(
                "{} '{}' at {:#06x} -> {:#06x}",
                address.kind,
                address.identifier,
                address.output_offset,
                word
            );
            patches.push((address.output_offset, word));
        }

        for (output_offset, word) in patches {
            self.rom.patch_word(output_offset, word);
        }

        Ok(())
    }
}

/// Generate machine code for a parsed program.
#[tracing::instrument(skip_all)]
pub fn generate(program: &mut Program) -> Result<Vec<u8>, CodeGenError> {
    let mut codegen = CodeGen::new();
    codegen.emit(program)?;
    codegen.resolve(&program.ast)?;
    Ok(codegen.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{lexer::lex, parser::parse};

    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> Result<Vec<u8>, CodeGenError> {
        let tokens = lex(source.as_bytes()).expect("lexing failed");
        let mut program = parse(tokens).expect("parsing failed");
        generate(&mut program)
    }

    #[test]
    fn test_generate() -> Result<(), CodeGenError> {
        let tests = vec![
            (
                "(def main (do (= %v0 5) (+ %v0 3) (draw %v0 %v0 1)))",
                vec![0x60, 0x05, 0x70, 0x03, 0xD0, 0x01],
            ),
            // Backward jump to the first instruction of the loop body
            ("(def main (loop (= %v0 1)))", vec![0x60, 0x01, 0x12, 0x00]),
            (
                "(def main (do (= %v0 0) (loop (+ %v0 1))))",
                vec![0x60, 0x00, 0x70, 0x01, 0x12, 0x02],
            ),
            // A bare label name compiles to a jump
            ("(def main (do (= %v0 1) main))", vec![0x60, 0x01, 0x12, 0x00]),
            // Forward reference
            (
                "(def main (do start (def start (= %v0 1))))",
                vec![0x12, 0x02, 0x60, 0x01],
            ),
            (
                "(def main (do (= %index sprite) (draw %v0 %v0 1) (def sprite (data 0xff))))",
                vec![0xA2, 0x04, 0xD0, 0x01, 0xFF],
            ),
            // Identifiers in data blocks become absolute addresses
            (
                "(def table (data 1 target)) (def target (data 2))",
                vec![0x01, 0x02, 0x03, 0x02],
            ),
            ("(def bytes (data 0 255 'A'))", vec![0x00, 0xFF, 0x41]),
            ("", vec![]),
        ];

        for (input, expected) in tests {
            assert_eq!(compile(input)?, expected, "{}", input);
        }
        Ok(())
    }

    #[test]
    fn test_label_offsets() -> Result<(), CodeGenError> {
        let tokens =
            lex(b"(def main (do (= %v0 5) (def inner (+ %v0 3))))").expect("lexing failed");
        let mut program = parse(tokens).expect("parsing failed");
        let mut codegen = CodeGen::new();
        codegen.emit(&mut program)?;

        assert!(codegen.unresolved().is_empty());
        let root = codegen.scopes().root();
        let main = codegen.scopes().resolve(root, "main", &program.ast);
        let main = main.expect("main is declared in the root scope");
        assert_eq!(program.ast[main].output_offset, Some(0));
        assert_eq!(codegen.scopes().resolve(root, "inner", &program.ast), None);

        let main_scope = codegen.scopes().get(root).children[0];
        let inner = codegen
            .scopes()
            .resolve(main_scope, "inner", &program.ast)
            .expect("inner is declared in main's scope");
        assert_eq!(program.ast[inner].output_offset, Some(2));
        Ok(())
    }

    #[test]
    fn test_scoping() -> Result<(), CodeGenError> {
        // Same name in disjoint subtrees
        assert_eq!(
            compile("(def a (def x (data 1))) (def b (def x (data 2)))")?,
            vec![0x01, 0x02]
        );

        // Labels of a sibling's body are not visible
        let result = compile("(def a (do (def inner (data 1)))) (def b (do inner))");
        assert!(
            matches!(result, Err(CodeGenError::UnknownIdentifier { ref name, .. }) if name == "inner"),
            "{:?}",
            result
        );

        // Labels declared in enclosing scopes are visible
        assert_eq!(
            compile("(def a (do (def inner (do (= %v0 1) (def deeper a)))))")?,
            vec![0x60, 0x01, 0x12, 0x00]
        );
        Ok(())
    }

    #[test]
    fn test_generate_errors() {
        let tests = vec![
            (
                "(def x (data 1)) (def x (data 2))",
                CodeGenError::DuplicateLabel {
                    name: "x".to_string(),
                    offset: 17,
                },
            ),
            (
                "(def main (do ghost))",
                CodeGenError::UnknownIdentifier {
                    name: "ghost".to_string(),
                    offset: 14,
                },
            ),
            (
                "(def d (data 256))",
                CodeGenError::IntegerTooLarge {
                    value: 256,
                    max: 255,
                    offset: 13,
                },
            ),
            (
                "(def d (data 1 %v3))",
                CodeGenError::RegisterFoundInDataBlock {
                    register: Register::V(3),
                    offset: 15,
                },
            ),
            (
                "(def d (data 1 ghost))",
                CodeGenError::UnknownIdentifier {
                    name: "ghost".to_string(),
                    offset: 15,
                },
            ),
        ];

        for (input, expected) in tests {
            assert_eq!(compile(input), Err(expected), "{}", input);
        }
    }

    #[test]
    fn test_address_out_of_range() {
        let padding = "0 ".repeat(0xE00);

        let far_label = format!(
            "(def pad (data {})) (def main (do far)) (def far (data 1))",
            padding
        );
        assert!(matches!(
            compile(&far_label),
            Err(CodeGenError::AddressOutOfRange {
                address: 0x1002,
                ..
            })
        ));

        let far_loop = format!("(def pad (data {})) (def main (loop (= %v0 1)))", padding);
        assert!(matches!(
            compile(&far_loop),
            Err(CodeGenError::AddressOutOfRange {
                address: 0x1000,
                ..
            })
        ));
    }

    #[test]
    fn test_resolve_patches_nothing_on_error() -> Result<(), CodeGenError> {
        let tokens = lex(b"(def main (do main ghost))").expect("lexing failed");
        let mut program = parse(tokens).expect("parsing failed");
        let mut codegen = CodeGen::new();
        codegen.emit(&mut program)?;
        assert_eq!(codegen.unresolved().len(), 2);

        assert!(codegen.resolve(&program.ast).is_err());
        assert_eq!(codegen.as_bytes(), &[0x00, 0x00, 0x00, 0x00]);
        Ok(())
    }
}
