use std::ops::{Index, IndexMut};

pub use self::value::{Atom, Register, Value};
use crate::compiler::codegen::builtins::Builtin;

/// Operands of builtins and data blocks.
pub mod value;

/// Stable handle to a node in the [`Ast`] arena.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, PartialOrd, Ord)]
pub struct NodeId(usize);

/// What a node in the AST represents.
#[derive(Debug, PartialEq, Clone)]
pub enum NodeKind {
    /// A named location in the output, e.g. `(def main (do ...))`.
    ///
    /// Introduces a new scope for its body.
    Label { name: String, body: NodeId },
    /// A call to a builtin operation, e.g. `(= %v0 5)`
    BuiltinCall {
        operation: &'static Builtin,
        args: Vec<Atom>,
    },
    /// `(loop body)`, the body followed by a jump back to its start
    Loop { body: NodeId },
    /// `(data 1 2 label)`, raw bytes and label addresses
    Data { values: Vec<Atom> },
    /// `(do ...)`, statements emitted in order
    Sequence { statements: Vec<NodeId> },
    /// A bare label name used as a statement, compiled to a jump to that label
    UnresolvedIdentifier(String),
}

/// A single node in the AST.
#[derive(Debug, PartialEq, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Byte offset into the source
    pub offset: usize,
    /// Offset into the output, set when code generation visits the node
    pub output_offset: Option<usize>,
}

/// Arena holding every node of a program.
///
/// Nodes are only ever appended, so a [`NodeId`] stays valid for the lifetime of the arena.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: NodeKind, offset: usize) -> NodeId {
        self.nodes.push(Node {
            kind,
            offset,
            output_offset: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Name of the label at `id`, `None` if the node is not a label.
    pub fn label_name(&self, id: NodeId) -> Option<&str> {
        match &self[id].kind {
            NodeKind::Label { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Render the subtree at `id` back into source form.
    pub fn render(&self, id: NodeId) -> String {
        fn join(values: &[Atom]) -> String {
            values
                .iter()
                .map(|value| value.to_string())
                .collect::<Vec<String>>()
                .join(" ")
        }

        match &self[id].kind {
            NodeKind::Label { name, body } => format!("(def {} {})", name, self.render(*body)),
            NodeKind::BuiltinCall { operation, args } if args.is_empty() => {
                format!("({})", operation.name)
            }
            NodeKind::BuiltinCall { operation, args } => {
                format!("({} {})", operation.name, join(args))
            }
            NodeKind::Loop { body } => format!("(loop {})", self.render(*body)),
            NodeKind::Data { values } => format!("(data {})", join(values)),
            NodeKind::Sequence { statements } if statements.is_empty() => "(do)".to_owned(),
            NodeKind::Sequence { statements } => format!(
                "(do {})",
                statements
                    .iter()
                    .map(|statement| self.render(*statement))
                    .collect::<Vec<String>>()
                    .join(" ")
            ),
            NodeKind::UnresolvedIdentifier(name) => name.clone(),
        }
    }
}

impl Index<NodeId> for Ast {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for Ast {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

/// A parsed program: the node arena and the top level statement sequence.
#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub ast: Ast,
    pub body: NodeId,
}
