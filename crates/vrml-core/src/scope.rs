//! Lexical scopes: a tree of name tables for DEF'd nodes and node types.
//!
//! Scopes live in an arena and refer to their parent by id; a parent never
//! owns its children. Lookups walk the parent chain and the first hit wins.

use crate::id::Name;
use crate::node_type::NodeType;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    /// Document URI for a root scope, PROTO name for a body scope.
    pub id: String,
    pub parent: Option<ScopeId>,
    nodes: HashMap<Name, NodeIndex>,
    types: HashMap<Name, Arc<NodeType>>,
}

/// Result of resolving a `USE` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLookup {
    Resolved(NodeIndex),
    /// A Script body naming the Script itself. Patched once the Script node
    /// exists.
    SelfReference,
    Unresolved,
}

#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new parentless scope holding the given types.
    pub fn root(&mut self, id: impl Into<String>, types: Vec<Arc<NodeType>>) -> ScopeId {
        let scope = self.push(id.into(), None);
        for ty in types {
            self.scopes[scope.0].types.insert(ty.id, ty);
        }
        scope
    }

    pub fn child(&mut self, parent: ScopeId, id: impl Into<String>) -> ScopeId {
        self.push(id.into(), Some(parent))
    }

    fn push(&mut self, id: String, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(Scope {
            id,
            parent,
            nodes: HashMap::new(),
            types: HashMap::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    pub fn get(&self, scope: ScopeId) -> &Scope {
        &self.scopes[scope.0]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// `scope`, then its parent, up to the root.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = &Scope> {
        std::iter::successors(Some(self.get(scope)), |s| s.parent.map(|p| self.get(p)))
    }

    pub fn find_node(&self, scope: ScopeId, name: Name) -> Option<NodeIndex> {
        self.ancestors(scope)
            .find_map(|s| s.nodes.get(&name).copied())
    }

    /// Resolve a `USE` target. `self_id` is the DEF name of the Script node
    /// whose body is being parsed, if any.
    pub fn lookup_node(&self, scope: ScopeId, name: Name, self_id: Option<Name>) -> NodeLookup {
        if self_id == Some(name) {
            return NodeLookup::SelfReference;
        }
        match self.find_node(scope, name) {
            Some(node) => NodeLookup::Resolved(node),
            None => NodeLookup::Unresolved,
        }
    }

    pub fn find_type(&self, scope: ScopeId, name: Name) -> Option<&Arc<NodeType>> {
        self.ancestors(scope).find_map(|s| s.types.get(&name))
    }

    /// Bind a node name in `scope` only. False if the name is already bound
    /// in that exact scope.
    pub fn add_node(&mut self, scope: ScopeId, name: Name, node: NodeIndex) -> bool {
        let nodes = &mut self.scopes[scope.0].nodes;
        if nodes.contains_key(&name) {
            return false;
        }
        nodes.insert(name, node);
        true
    }

    /// Bind a type under its id in `scope` only. False if the id is already
    /// bound in that exact scope.
    pub fn add_type(&mut self, scope: ScopeId, ty: Arc<NodeType>) -> bool {
        let types = &mut self.scopes[scope.0].types;
        if types.contains_key(&ty.id) {
            return false;
        }
        types.insert(ty.id, ty);
        true
    }

    /// Names of nodes bound directly in `scope`.
    pub fn node_names(&self, scope: ScopeId) -> impl Iterator<Item = (Name, NodeIndex)> + '_ {
        self.get(scope).nodes.iter().map(|(n, i)| (*n, *i))
    }

    /// Every node bound by name in any scope of the tree.
    pub fn bound_nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.scopes.iter().flat_map(|s| s.nodes.values().copied())
    }

    /// Every type visible from `scope`, innermost binding first.
    pub fn visible_types(&self, scope: ScopeId) -> Vec<&Arc<NodeType>> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for s in self.ancestors(scope) {
            for (name, ty) in &s.types {
                if seen.insert(*name) {
                    out.push(ty);
                }
            }
        }
        out
    }

    /// `#`-joined scope ids from the root down, e.g. `world.wrl#Outer#Inner`.
    /// PROTO class identities are built from this.
    pub fn path(&self, scope: ScopeId) -> String {
        let mut ids: Vec<&str> = self.ancestors(scope).map(|s| s.id.as_str()).collect();
        ids.reverse();
        ids.join("#")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::builtin_types;

    #[test]
    fn lookup_walks_parent_chain_and_inner_shadows_outer() {
        let mut tree = ScopeTree::new();
        let root = tree.root("a.wrl", Vec::new());
        let inner = tree.child(root, "P");
        let x = Name::intern("X");
        assert!(tree.add_node(root, x, NodeIndex::new(1)));
        assert_eq!(tree.find_node(inner, x), Some(NodeIndex::new(1)));

        assert!(tree.add_node(inner, x, NodeIndex::new(2)));
        assert_eq!(tree.find_node(inner, x), Some(NodeIndex::new(2)));
        assert_eq!(tree.find_node(root, x), Some(NodeIndex::new(1)));
    }

    #[test]
    fn sibling_scopes_do_not_see_each_other() {
        let mut tree = ScopeTree::new();
        let root = tree.root("a.wrl", Vec::new());
        let left = tree.child(root, "L");
        let right = tree.child(root, "R");
        let y = Name::intern("Y");
        tree.add_node(left, y, NodeIndex::new(3));
        assert_eq!(tree.lookup_node(right, y, None), NodeLookup::Unresolved);
        assert_eq!(tree.lookup_node(root, y, None), NodeLookup::Unresolved);
        assert_eq!(tree.lookup_node(left, y, None), NodeLookup::Resolved(NodeIndex::new(3)));
    }

    #[test]
    fn duplicates_rejected_only_in_same_scope() {
        let mut tree = ScopeTree::new();
        let root = tree.root("a.wrl", builtin_types());
        let inner = tree.child(root, "P");
        let box_type = tree.find_type(root, Name::intern("Box")).unwrap().clone();
        assert!(!tree.add_type(root, box_type.clone()));
        assert!(tree.add_type(inner, box_type));

        let n = Name::intern("N");
        assert!(tree.add_node(root, n, NodeIndex::new(0)));
        assert!(!tree.add_node(root, n, NodeIndex::new(5)));
        assert_eq!(tree.find_node(root, n), Some(NodeIndex::new(0)));
    }

    #[test]
    fn self_reference_is_tagged() {
        let mut tree = ScopeTree::new();
        let root = tree.root("a.wrl", Vec::new());
        let me = Name::intern("ME");
        assert_eq!(tree.lookup_node(root, me, Some(me)), NodeLookup::SelfReference);
    }

    #[test]
    fn path_joins_scope_ids() {
        let mut tree = ScopeTree::new();
        let root = tree.root("world.wrl", Vec::new());
        let outer = tree.child(root, "Outer");
        let inner = tree.child(outer, "Inner");
        assert_eq!(tree.path(inner), "world.wrl#Outer#Inner");
    }
}
