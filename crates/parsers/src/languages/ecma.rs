//! Shared arena builder for the ECMAScript family (TypeScript, JavaScript).
//! The two grammars emit near-identical node kinds, so one walker covers
//! both adapters.

use ir::ast::{kind, AstArena, AstNode, Meta, NodeId};
use serde_json::Value as JsonValue;
use tree_sitter::Node;

pub(crate) fn build_arena(root: Node, src: &str, file: &str) -> AstArena {
    let mut arena = AstArena::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        walk(child, src, file, &mut arena, None);
    }
    arena
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

/// Resolves the fully-qualified callee text by recursing through member
/// accesses instead of taking the raw source slice.
pub(crate) fn resolve_callee(node: Node, src: &str) -> String {
    match node.kind() {
        "identifier" | "property_identifier" | "private_property_identifier" => {
            text(node, src).to_string()
        }
        "member_expression" => {
            let object = node
                .child_by_field_name("object")
                .map(|o| resolve_callee(o, src))
                .unwrap_or_default();
            let property = node
                .child_by_field_name("property")
                .map(|p| text(p, src).to_string())
                .unwrap_or_default();
            if object.is_empty() {
                property
            } else {
                format!("{object}.{property}")
            }
        }
        "call_expression" => node
            .child_by_field_name("function")
            .map(|f| resolve_callee(f, src))
            .unwrap_or_default(),
        "await_expression" | "parenthesized_expression" | "non_null_expression" => node
            .named_child(0)
            .map(|c| resolve_callee(c, src))
            .unwrap_or_default(),
        _ => text(node, src).trim().to_string(),
    }
}

fn unquote(raw: &str) -> String {
    raw.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

fn walk_children(node: Node, src: &str, file: &str, arena: &mut AstArena, parent: Option<NodeId>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk(child, src, file, arena, parent);
    }
}

fn walk(node: Node, src: &str, file: &str, arena: &mut AstArena, parent: Option<NodeId>) {
    match node.kind() {
        "function_declaration"
        | "generator_function_declaration"
        | "function"
        | "function_expression"
        | "method_definition"
        | "arrow_function" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| text(n, src).to_string())
                .unwrap_or_default();
            let id = push(arena, parent, node, file, kind::FUNCTION, JsonValue::from(name));
            if let Some(params) = node.child_by_field_name("parameters") {
                collect_params(params, src, file, arena, id);
            } else if let Some(param) = node.child_by_field_name("parameter") {
                // single-identifier arrow parameter
                push(
                    arena,
                    Some(id),
                    param,
                    file,
                    kind::PARAMETER,
                    JsonValue::from(text(param, src)),
                );
            }
            if let Some(body) = node.child_by_field_name("body") {
                walk(body, src, file, arena, Some(id));
            }
        }
        "call_expression" | "new_expression" => {
            let callee_node = node
                .child_by_field_name("function")
                .or_else(|| node.child_by_field_name("constructor"));
            let callee = callee_node
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
        "variable_declarator" => {
            let name = node
                .child_by_field_name("name")
                .map(|n| text(n, src).to_string())
                .unwrap_or_default();
            let id = push(arena, parent, node, file, kind::VARIABLE, JsonValue::from(name));
            if let Some(value) = node.child_by_field_name("value") {
                walk(value, src, file, arena, Some(id));
            }
        }
        "assignment_expression" | "augmented_assignment_expression" => {
            let target = node
                .child_by_field_name("left")
                .map(|l| text(l, src).to_string())
                .unwrap_or_default();
            let id = push(arena, parent, node, file, kind::ASSIGNMENT, JsonValue::from(target));
            if let Some(right) = node.child_by_field_name("right") {
                walk(right, src, file, arena, Some(id));
            }
        }
        "identifier" | "property_identifier" | "shorthand_property_identifier" => {
            push(
                arena,
                parent,
                node,
                file,
                kind::IDENTIFIER,
                JsonValue::from(text(node, src)),
            );
        }
        "member_expression" => {
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
        "string" | "template_string" => {
            let id = push(
                arena,
                parent,
                node,
                file,
                kind::STRING,
                JsonValue::from(unquote(text(node, src))),
            );
            // template substitutions keep identifiers visible to the taint pass
            walk_children(node, src, file, arena, Some(id));
        }
        "number" => {
            let value = text(node, src).parse::<f64>().ok();
            push(arena, parent, node, file, kind::NUMBER, match value {
                Some(n) => JsonValue::from(n),
                None => JsonValue::Null,
            });
        }
        "array" => {
            let id = push(arena, parent, node, file, kind::ARRAY, JsonValue::Null);
            walk_children(node, src, file, arena, Some(id));
        }
        "object" => {
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
        "import_statement" => {
            let target = node
                .child_by_field_name("source")
                .map(|s| unquote(text(s, src)))
                .unwrap_or_default();
            push(arena, parent, node, file, kind::IMPORT, JsonValue::from(target));
        }
        "template_substitution" | "expression_statement" | "await_expression"
        | "parenthesized_expression" | "non_null_expression" => {
            walk_children(node, src, file, arena, parent);
        }
        _ => {
            walk_children(node, src, file, arena, parent);
        }
    }
}

fn collect_params(params: Node, src: &str, file: &str, arena: &mut AstArena, func: NodeId) {
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        let name_node = match param.kind() {
            "identifier" => Some(param),
            "required_parameter" | "optional_parameter" => param
                .child_by_field_name("pattern")
                .or_else(|| param.named_child(0)),
            "assignment_pattern" => param.child_by_field_name("left"),
            _ => param.named_child(0),
        };
        if let Some(n) = name_node {
            if n.kind() == "identifier" {
                push(
                    arena,
                    Some(func),
                    n,
                    file,
                    kind::PARAMETER,
                    JsonValue::from(text(n, src)),
                );
            }
        }
    }
}
