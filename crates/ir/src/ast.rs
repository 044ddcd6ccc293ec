//! Arena-based AST shared by every language adapter.
//!
//! Nodes live in a flat vector and reference each other through integer
//! [`NodeId`]s; a parallel parent array answers ancestor queries without
//! chasing owned subtrees. Adapters normalise grammar-specific node kinds
//! into the logical kinds listed in [`kind`], so the analysis passes never
//! see raw tree-sitter names.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Index of a node inside an [`AstArena`].
pub type NodeId = usize;

/// Normalised node kinds produced by the language adapters.
pub mod kind {
    pub const FUNCTION: &str = "FunctionDeclaration";
    pub const PARAMETER: &str = "Parameter";
    pub const CALL: &str = "CallExpression";
    pub const ARGUMENT: &str = "Argument";
    pub const IDENTIFIER: &str = "Identifier";
    pub const MEMBER: &str = "MemberExpression";
    pub const ASSIGNMENT: &str = "AssignmentExpression";
    pub const VARIABLE: &str = "VariableDeclarator";
    pub const STRING: &str = "StringLiteral";
    pub const NUMBER: &str = "NumberLiteral";
    pub const ARRAY: &str = "ArrayExpression";
    pub const OBJECT: &str = "ObjectExpression";
    pub const PROPERTY: &str = "Property";
    pub const TRY: &str = "TryStatement";
    pub const IMPORT: &str = "ImportStatement";
    pub const OTHER: &str = "Other";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Location metadata shared by all IR artifacts.
pub struct Meta {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstNode {
    /// Logical kind, one of the constants in [`kind`].
    pub kind: String,
    /// Value associated with the node: callee text for calls, name for
    /// identifiers and declarations, literal content for literals.
    pub value: JsonValue,
    /// Children in source order, by arena index.
    pub children: Vec<NodeId>,
    /// Location metadata.
    pub meta: Meta,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
/// Flat AST for one file: node vector plus a parallel parent index.
pub struct AstArena {
    pub nodes: Vec<AstNode>,
    /// `parents[id]` is the parent of `id`, `None` for roots.
    pub parents: Vec<Option<NodeId>>,
    /// Top-level nodes in source order.
    pub roots: Vec<NodeId>,
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and wires it under `parent` (or as a root).
    pub fn push(&mut self, node: AstNode, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.parents.push(parent);
        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&AstNode> {
        self.nodes.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks the parent chain starting at the parent of `id`.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            next: self.parents.get(id).copied().flatten(),
        }
    }

    /// Pre-order traversal of the subtree rooted at `id`.
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            out.push(cur);
            if let Some(node) = self.nodes.get(cur) {
                for &child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }

    /// Pre-order traversal over every root, preserving source order.
    pub fn preorder_all(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &root in &self.roots {
            out.extend(self.preorder(root));
        }
        out
    }

    /// Nodes of the subtree at `id` no deeper than `max_depth` levels below it.
    pub fn bounded(&self, id: NodeId, max_depth: usize) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![(id, 0usize)];
        while let Some((cur, depth)) = stack.pop() {
            out.push(cur);
            if depth >= max_depth {
                continue;
            }
            if let Some(node) = self.nodes.get(cur) {
                for &child in node.children.iter().rev() {
                    stack.push((child, depth + 1));
                }
            }
        }
        out
    }
}

/// Iterator over the ancestor chain of a node.
pub struct Ancestors<'a> {
    arena: &'a AstArena,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.next?;
        self.next = self.arena.parents.get(cur).copied().flatten();
        Some(cur)
    }
}
