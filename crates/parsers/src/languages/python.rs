//! Python adapter backed by the tree-sitter grammar.
//!
//! Import targets are normalised into path form: leading dots of a relative
//! import become `./` or `../` segments and dotted modules become slashed
//! paths, so the dependency graph builder can resolve them with the same
//! canonical-key lookup used for the ECMAScript languages.

use super::{LanguageAdapter};
use anyhow::anyhow;
use ir::ast::{kind, AstArena, AstNode, Meta, NodeId};
use ir::{Language, SourceUnit};
use serde_json::Value as JsonValue;
use tree_sitter::Node;

pub struct PythonAdapter;

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn parse(&self, unit: &SourceUnit) -> anyhow::Result<AstArena> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(tree_sitter_python::language())
            .map_err(|e| anyhow!("python grammar: {e}"))?;
        let tree = parser
            .parse(&unit.content, None)
            .ok_or_else(|| anyhow!("python parse failed: {}", unit.path))?;
        let mut arena = AstArena::new();
        let root = tree.root_node();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            walk(child, &unit.content, &unit.path, &mut arena, None);
        }
        Ok(arena)
    }

    fn extract_imports(&self, unit: &SourceUnit, arena: Option<&AstArena>) -> Vec<String> {
        match arena {
            Some(a) => super::imports_from_arena(a),
            None => match self.parse(unit) {
                Ok(a) => super::imports_from_arena(&a),
                Err(_) => Vec::new(),
            },
        }
    }
}

fn text<'a>(node: Node, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

fn meta(node: Node, file: &str) -> Meta {
    let pos = node.start_position();
    Meta {
        file: file.to_string(),
        line: pos.row + 1,
        column: pos.column + 1,
    }
}

fn push(
    arena: &mut AstArena,
    parent: Option<NodeId>,
    node: Node,
    file: &str,
    kind: &str,
    value: JsonValue,
) -> NodeId {
    arena.push(
        AstNode {
            kind: kind.to_string(),
            value,
            children: Vec::new(),
            meta: meta(node, file),
        },
        parent,
    )
}

fn resolve_callee(node: Node, src: &str) -> String {
    match node.kind() {
        "identifier" => text(node, src).to_string(),
        "attribute" => {
            let object = node
                .child_by_field_name("object")
                .map(|o| resolve_callee(o, src))
                .unwrap_or_default();
            let attribute = node
                .child_by_field_name("attribute")
                .map(|a| text(a, src).to_string())
                .unwrap_or_default();
            if object.is_empty() {
                attribute
            } else {
                format!("{object}.{attribute}")
            }
        }
        "call" => node
            .child_by_field_name("function")
            .map(|f| resolve_callee(f, src))
            .unwrap_or_default(),
        "await" | "parenthesized_expression" => node
            .named_child(0)
            .map(|c| resolve_callee(c, src))
            .unwrap_or_default(),
        _ => text(node, src).trim().to_string(),
    }
}

fn unquote(raw: &str) -> String {
    let start = raw.find(['"', '\'']).unwrap_or(0);
    raw[start..].trim_matches(|c| c == '"' || c == '\'').to_string()
}

/// Converts a module reference into path form: `.utils` -> `./utils`,
/// `..pkg.mod` -> `../pkg/mod`, `pkg.mod` -> `pkg/mod`.
fn module_to_path(module: &str, first_name: Option<&str>) -> String {
    let dots = module.chars().take_while(|&c| c == '.').count();
    let rest = module[dots..].replace('.', "/");
    let rest = if rest.is_empty() {
        first_name.unwrap_or_default().to_string()
    } else {
        rest
    };
    match dots {
        0 => rest,
        1 => format!("./{rest}"),
        n => format!("{}{rest}", "../".repeat(n - 1)),
    }
}

fn walk_children(node: Node, src: &str, file: &str, arena: &mut AstArena, parent: Option<NodeId>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk(child, src, file, arena, parent);
    }
}

fn walk(node: Node, src: &str, file: &str, arena: &mut AstArena, parent: Option<NodeId>) {
    match node.kind() {
        "function_definition" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| text(n, src).to_string())
                .unwrap_or_default();
            let id = push(arena, parent, node, file, kind::FUNCTION, JsonValue::from(name));
            if let Some(params) = node.child_by_field_name("parameters") {
                collect_params(params, src, file, arena, id);
            }
            if let Some(body) = node.child_by_field_name("body") {
                walk_children(body, src, file, arena, Some(id));
            }
        }
        "call" => {
            let callee = node
                .child_by_field_name("function")
                .map(|f| resolve_callee(f, src))
                .unwrap_or_default();
            let id = push(arena, parent, node, file, kind::CALL, JsonValue::from(callee));
            if let Some(args) = node.child_by_field_name("arguments") {
                let mut cursor = args.walk();
                for arg in args.named_children(&mut cursor) {
                    let arg_id = push(arena, Some(id), arg, file, kind::ARGUMENT, JsonValue::Null);
                    walk(arg, src, file, arena, Some(arg_id));
                }
            }
        }
        "try_statement" => {
            let id = push(arena, parent, node, file, kind::TRY, JsonValue::Null);
            walk_children(node, src, file, arena, Some(id));
        }
        "assignment" | "augmented_assignment" => {
            let target = node
                .child_by_field_name("left")
                .map(|l| text(l, src).to_string())
                .unwrap_or_default();
            let id = push(arena, parent, node, file, kind::ASSIGNMENT, JsonValue::from(target));
            if let Some(right) = node.child_by_field_name("right") {
                walk(right, src, file, arena, Some(id));
            }
        }
        "identifier" => {
            push(
                arena,
                parent,
                node,
                file,
                kind::IDENTIFIER,
                JsonValue::from(text(node, src)),
            );
        }
        "attribute" => {
            let id = push(
                arena,
                parent,
                node,
                file,
                kind::MEMBER,
                JsonValue::from(resolve_callee(node, src)),
            );
            if let Some(object) = node.child_by_field_name("object") {
                walk(object, src, file, arena, Some(id));
            }
        }
        "string" | "concatenated_string" => {
            let id = push(
                arena,
                parent,
                node,
                file,
                kind::STRING,
                JsonValue::from(unquote(text(node, src))),
            );
            // f-string interpolations keep identifiers visible to the taint pass
            walk_children(node, src, file, arena, Some(id));
        }
        "integer" | "float" => {
            let value = text(node, src).parse::<f64>().ok();
            push(arena, parent, node, file, kind::NUMBER, match value {
                Some(n) => JsonValue::from(n),
                None => JsonValue::Null,
            });
        }
        "list" | "tuple" | "set" => {
            let id = push(arena, parent, node, file, kind::ARRAY, JsonValue::Null);
            walk_children(node, src, file, arena, Some(id));
        }
        "dictionary" => {
            let id = push(arena, parent, node, file, kind::OBJECT, JsonValue::Null);
            walk_children(node, src, file, arena, Some(id));
        }
        "pair" => {
            let key = node
                .child_by_field_name("key")
                .map(|k| unquote(text(k, src)))
                .unwrap_or_default();
            let id = push(arena, parent, node, file, kind::PROPERTY, JsonValue::from(key));
            if let Some(value) = node.child_by_field_name("value") {
                walk(value, src, file, arena, Some(id));
            }
        }
        "keyword_argument" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| text(n, src).to_string())
                .unwrap_or_default();
            let id = push(arena, parent, node, file, kind::PROPERTY, JsonValue::from(name));
            if let Some(value) = node.child_by_field_name("value") {
                walk(value, src, file, arena, Some(id));
            }
        }
        "import_statement" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                let module = match child.kind() {
                    "dotted_name" => text(child, src).to_string(),
                    "aliased_import" => child
                        .child_by_field_name("name")
                        .map(|n| text(n, src).to_string())
                        .unwrap_or_default(),
                    _ => continue,
                };
                push(
                    arena,
                    parent,
                    node,
                    file,
                    kind::IMPORT,
                    JsonValue::from(module_to_path(&module, None)),
                );
            }
        }
        "import_from_statement" => {
            let module = node
                .child_by_field_name("module_name")
                .map(|m| text(m, src).to_string())
                .unwrap_or_default();
            let first_name = first_imported_name(node, src);
            push(
                arena,
                parent,
                node,
                file,
                kind::IMPORT,
                JsonValue::from(module_to_path(&module, first_name.as_deref())),
            );
        }
        "expression_statement" | "await" | "parenthesized_expression" => {
            walk_children(node, src, file, arena, parent);
        }
        _ => {
            walk_children(node, src, file, arena, parent);
        }
    }
}

/// First name after `import` in a `from X import a, b` statement, used when
/// the module part is only dots (`from . import sibling`).
fn first_imported_name(node: Node, src: &str) -> Option<String> {
    let module = node.child_by_field_name("module_name")?;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.start_byte() <= module.start_byte() {
            continue;
        }
        match child.kind() {
            "dotted_name" | "identifier" => return Some(text(child, src).to_string()),
            "aliased_import" => {
                return child
                    .child_by_field_name("name")
                    .map(|n| text(n, src).to_string())
            }
            _ => {}
        }
    }
    None
}

fn collect_params(params: Node, src: &str, file: &str, arena: &mut AstArena, func: NodeId) {
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        let name_node = match param.kind() {
            "identifier" => Some(param),
            "typed_parameter" => param.named_child(0),
            "default_parameter" | "typed_default_parameter" => param.child_by_field_name("name"),
            _ => None,
        };
        if let Some(n) = name_node {
            if n.kind() == "identifier" {
                let name = text(n, src);
                if name == "self" || name == "cls" {
                    continue;
                }
                push(
                    arena,
                    Some(func),
                    n,
                    file,
                    kind::PARAMETER,
                    JsonValue::from(name),
                );
            }
        }
    }
}
