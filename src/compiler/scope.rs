use crate::{
    ast::{Ast, NodeId},
    compiler::codegen::CodeGenError,
};

/// Stable handle to a scope in the [`ScopeTree`].
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy)]
pub struct ScopeId(usize);

/// A lexical scope.
///
/// Every label introduces a scope for its body. The root scope is the whole program.
#[derive(Debug, PartialEq)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Labels declared directly in this scope, in declaration order
    pub labels: Vec<NodeId>,
    /// The label that introduced the scope, `None` for the root
    pub owner: Option<NodeId>,
}

/// Tree of lexical scopes, built while generating code.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> ScopeTree {
        ScopeTree {
            scopes: vec![Scope {
                parent: None,
                children: Vec::new(),
                labels: Vec::new(),
                owner: None,
            }],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Open a new scope below `parent` for the body of `owner`.
    pub fn new_child(&mut self, parent: ScopeId, owner: NodeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            children: Vec::new(),
            labels: Vec::new(),
            owner: Some(owner),
        });
        self.scopes[parent.0].children.push(id);
        id
    }

    /// Find a label declared directly in `scope`.
    fn find_in(&self, scope: ScopeId, name: &str, ast: &Ast) -> Option<NodeId> {
        self.get(scope)
            .labels
            .iter()
            .copied()
            .find(|label| ast.label_name(*label) == Some(name))
    }

    /// Declare `label` in `scope`.
    ///
    /// Names must be unique within a scope but may shadow names of enclosing scopes.
    #[tracing::instrument(skip(self, ast))]
    pub fn register_label(
        &mut self,
        scope: ScopeId,
        label: NodeId,
        ast: &Ast,
    ) -> Result<(), CodeGenError> {
        let name = ast.label_name(label).unwrap_or_default();
        if self.find_in(scope, name, ast).is_some() {
            return Err(CodeGenError::DuplicateLabel {
                name: name.to_owned(),
                offset: ast[label].offset,
            });
        }
        self.scopes[scope.0].labels.push(label);
        Ok(())
    }

    /// `scope` followed by its parent, grandparent and so on up to the root.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), |id| self.get(*id).parent)
    }

    /// Resolve `name` as seen from `scope`, the innermost declaration wins.
    pub fn resolve(&self, scope: ScopeId, name: &str, ast: &Ast) -> Option<NodeId> {
        self.ancestors(scope)
            .find_map(|scope| self.find_in(scope, name, ast))
    }
}
