//! Single-file, intraprocedural taint propagation.
//!
//! Every function parameter and every variable initialised from a source
//! call (or from another tainted identifier) seeds the tainted set; a single
//! pre-order pass propagates through assignments, literals and call
//! arguments. Taint never crosses function-call boundaries and unhandled
//! node kinds default to not tainted. This pass never fails.

use ir::ast::{kind, AstArena, NodeId};
use ir::{SourceUnit, TaintFlow, COMPLEX_EXPRESSION};
use std::collections::HashSet;

#[derive(Debug, Clone)]
/// Source and sink callee pattern sets, matched by substring.
pub struct TaintPatterns {
    pub sources: Vec<String>,
    pub sinks: Vec<String>,
}

impl Default for TaintPatterns {
    fn default() -> Self {
        Self {
            sources: [
                "input",
                "req.query",
                "req.body",
                "req.params",
                "request.args",
                "request.form",
                "process.argv",
                "sys.argv",
                "os.environ",
            ]
            .map(String::from)
            .to_vec(),
            sinks: [
                "eval",
                "exec",
                "execute",
                "raw_query",
                "os.system",
                "subprocess.run",
                "dangerouslySetInnerHTML",
                "completions.create",
                "messages.create",
                "generate_content",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

pub struct TaintAnalyzer {
    patterns: TaintPatterns,
}

impl TaintAnalyzer {
    pub fn new(patterns: TaintPatterns) -> Self {
        Self { patterns }
    }

    /// Runs the pass over one file's arena. Flows come out in scope order
    /// (module scope first, then each function in pre-order position).
    pub fn analyze(&self, unit: &SourceUnit, arena: &AstArena) -> Vec<TaintFlow> {
        let mut flows = Vec::new();

        // module scope: roots minus function subtrees, no seeded parameters
        let module_nodes = scope_nodes(arena, None);
        self.analyze_scope(unit, arena, &module_nodes, HashSet::new(), &mut flows);

        for id in arena.preorder_all() {
            if arena.nodes[id].kind != kind::FUNCTION {
                continue;
            }
            let seeds: HashSet<String> = arena.nodes[id]
                .children
                .iter()
                .filter(|&&c| arena.nodes[c].kind == kind::PARAMETER)
                .filter_map(|&c| arena.nodes[c].value.as_str().map(str::to_string))
                .collect();
            let body = scope_nodes(arena, Some(id));
            self.analyze_scope(unit, arena, &body, seeds, &mut flows);
        }
        flows
    }

    fn analyze_scope(
        &self,
        unit: &SourceUnit,
        arena: &AstArena,
        nodes: &[NodeId],
        mut tainted: HashSet<String>,
        flows: &mut Vec<TaintFlow>,
    ) {
        for &id in nodes {
            let node = &arena.nodes[id];
            match node.kind.as_str() {
                k if k == kind::VARIABLE || k == kind::ASSIGNMENT => {
                    let target = node.value.as_str().unwrap_or_default();
                    if !target.is_empty()
                        && node
                            .children
                            .iter()
                            .any(|&c| self.is_tainted(arena, c, &tainted))
                    {
                        tainted.insert(target.to_string());
                    }
                }
                k if k == kind::CALL => {
                    let callee = node.value.as_str().unwrap_or_default();
                    if !self.matches(&self.patterns.sinks, callee) {
                        continue;
                    }
                    for &arg in &node.children {
                        if arena.nodes[arg].kind != kind::ARGUMENT {
                            continue;
                        }
                        if self.is_tainted(arena, arg, &tainted) {
                            flows.push(TaintFlow {
                                file: unit.path.clone(),
                                line: node.meta.line,
                                sink: callee.to_string(),
                                variable: simple_identifier(arena, arg)
                                    .unwrap_or_else(|| COMPLEX_EXPRESSION.to_string()),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn matches(&self, patterns: &[String], callee: &str) -> bool {
        !callee.is_empty() && patterns.iter().any(|p| callee.contains(p.as_str()))
    }

    /// Flow-insensitive expression check against the current tainted set.
    fn is_tainted(&self, arena: &AstArena, id: NodeId, tainted: &HashSet<String>) -> bool {
        let node = &arena.nodes[id];
        match node.kind.as_str() {
            k if k == kind::IDENTIFIER => node
                .value
                .as_str()
                .map(|n| tainted.contains(n))
                .unwrap_or(false),
            k if k == kind::CALL => {
                let callee = node.value.as_str().unwrap_or_default();
                self.matches(&self.patterns.sources, callee)
                    || node
                        .children
                        .iter()
                        .filter(|&&c| arena.nodes[c].kind == kind::ARGUMENT)
                        .any(|&c| self.is_tainted(arena, c, tainted))
            }
            k if k == kind::MEMBER => {
                // the object carries the taint; the full path may also be a
                // configured source (req.body and friends)
                let path = node.value.as_str().unwrap_or_default();
                self.matches(&self.patterns.sources, path)
                    || node
                        .children
                        .iter()
                        .any(|&c| self.is_tainted(arena, c, tainted))
            }
            k if k == kind::ARGUMENT
                || k == kind::ARRAY
                || k == kind::OBJECT
                || k == kind::PROPERTY
                || k == kind::STRING =>
            {
                node.children
                    .iter()
                    .any(|&c| self.is_tainted(arena, c, tainted))
            }
            // closed-world default: unhandled kinds are not tainted
            _ => false,
        }
    }
}

/// Pre-order nodes of a scope: the whole file for `None`, a function body
/// for `Some(id)`. Nested function subtrees belong to their own scope and
/// are excluded either way.
fn scope_nodes(arena: &AstArena, function: Option<NodeId>) -> Vec<NodeId> {
    let starts: Vec<NodeId> = match function {
        Some(f) => arena.nodes[f].children.clone(),
        None => arena.roots.clone(),
    };
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = starts.into_iter().rev().collect();
    while let Some(id) = stack.pop() {
        if arena.nodes[id].kind == kind::FUNCTION {
            continue;
        }
        out.push(id);
        for &child in arena.nodes[id].children.iter().rev() {
            stack.push(child);
        }
    }
    out
}

/// The bare variable name when an argument is a single identifier.
fn simple_identifier(arena: &AstArena, arg: NodeId) -> Option<String> {
    let children = &arena.nodes[arg].children;
    if children.len() != 1 {
        return None;
    }
    let child = &arena.nodes[children[0]];
    if child.kind == kind::IDENTIFIER {
        child.value.as_str().map(str::to_string)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir::Language;
    use parsers::parse_unit;

    fn analyze(path: &str, language: Language, content: &str) -> Vec<TaintFlow> {
        let unit = SourceUnit {
            path: path.into(),
            language,
            content: content.into(),
        };
        let arena = parse_unit(&unit).expect("parse");
        TaintAnalyzer::new(TaintPatterns::default()).analyze(&unit, &arena)
    }

    #[test]
    fn parameter_reaching_sink_reports_bare_name() {
        let flows = analyze(
            "handler.ts",
            Language::TypeScript,
            "function handle(user_input) {\n  eval(user_input);\n}\n",
        );
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].sink, "eval");
        assert_eq!(flows[0].variable, "user_input");
        assert_eq!(flows[0].line, 2);
    }

    #[test]
    fn wrapped_parameter_propagates_through_assignment() {
        let flows = analyze(
            "handler.ts",
            Language::TypeScript,
            "function handle(user_input) {\n  const wrapped = [user_input];\n  eval(wrapped);\n}\n",
        );
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].variable, "wrapped");
    }

    #[test]
    fn complex_expression_placeholder_for_non_identifiers() {
        let flows = analyze(
            "handler.ts",
            Language::TypeScript,
            "function handle(user_input) {\n  eval([user_input]);\n}\n",
        );
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].variable, COMPLEX_EXPRESSION);
    }

    #[test]
    fn source_call_seeds_module_scope_variable() {
        let flows = analyze(
            "cli.py",
            Language::Python,
            "data = input(\"> \")\nexec(data)\n",
        );
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].sink, "exec");
        assert_eq!(flows[0].variable, "data");
    }

    #[test]
    fn taint_does_not_cross_function_boundaries() {
        let flows = analyze(
            "split.ts",
            Language::TypeScript,
            "function produce(user_input) {\n  return user_input;\n}\nfunction consume(x) {\n  const v = produce(safe());\n}\n",
        );
        assert!(flows.is_empty());
    }

    #[test]
    fn untainted_arguments_stay_silent() {
        let flows = analyze(
            "clean.ts",
            Language::TypeScript,
            "function run(user_input) {\n  eval('static');\n}\n",
        );
        assert!(flows.is_empty());
    }
}
