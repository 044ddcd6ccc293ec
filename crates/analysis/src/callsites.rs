//! Classification of model call expressions.
//!
//! The AST path walks the arena in pre-order, matches resolved callee names
//! against a substring pattern set and derives the reliability predicates
//! structurally. When a unit has no arena the regex fallback scans raw text
//! with the same textual-window heuristics. Both paths are deterministic and
//! never fail.

use ir::ast::{kind, AstArena, NodeId};
use ir::{CallSite, SourceUnit};

#[derive(Debug, Clone)]
/// Pattern set steering call classification. Substring matching throughout.
pub struct CallPatterns {
    /// A call is classified when its callee contains one of these.
    pub callee_patterns: Vec<String>,
    /// Case-insensitive keywords that mark a prompt as grounded.
    pub grounding_keywords: Vec<String>,
    /// Markers for input validation near the call.
    pub validation_markers: Vec<String>,
    /// Markers for validation of the call's response.
    pub response_validation_markers: Vec<String>,
    /// Textual window (lines either side) for the nearness heuristics.
    pub window_lines: usize,
    /// Depth bound for argument-subtree traversals.
    pub argument_depth: usize,
}

impl Default for CallPatterns {
    fn default() -> Self {
        Self {
            callee_patterns: [
                "completions.create",
                "messages.create",
                "generate_content",
                "generateContent",
                "generateText",
                "invokeModel",
                "invoke_model",
                "createChatCompletion",
            ]
            .map(String::from)
            .to_vec(),
            grounding_keywords: ["context", "grounded", "according to", "based on", "reference"]
                .map(String::from)
                .to_vec(),
            validation_markers: ["validate", "schema", "sanitize", "safeParse", "parse_obj"]
                .map(String::from)
                .to_vec(),
            response_validation_markers: [
                "validateResponse",
                "response_schema",
                "safeParse",
                "model_validate",
            ]
            .map(String::from)
            .to_vec(),
            window_lines: 5,
            argument_depth: 6,
        }
    }
}

/// Extracts classified call sites from one file.
pub struct CallSiteExtractor {
    patterns: CallPatterns,
}

impl CallSiteExtractor {
    pub fn new(patterns: CallPatterns) -> Self {
        Self { patterns }
    }

    /// AST path when an arena is available, regex fallback otherwise.
    /// Output order follows AST pre-order (or line order on the fallback).
    pub fn extract(&self, unit: &SourceUnit, arena: Option<&AstArena>) -> Vec<CallSite> {
        match arena {
            Some(a) => self.extract_from_arena(unit, a),
            None => self.extract_from_text(unit),
        }
    }

    fn matches_callee(&self, callee: &str) -> bool {
        self.patterns
            .callee_patterns
            .iter()
            .any(|p| callee.contains(p.as_str()))
    }

    fn extract_from_arena(&self, unit: &SourceUnit, arena: &AstArena) -> Vec<CallSite> {
        let mut out = Vec::new();
        for id in arena.preorder_all() {
            let Some(node) = arena.get(id) else { continue };
            if node.kind != kind::CALL {
                continue;
            }
            let Some(callee) = node.value.as_str() else { continue };
            if !self.matches_callee(callee) {
                continue;
            }
            let args = self.argument_nodes(arena, id);
            out.push(CallSite {
                file: unit.path.clone(),
                line: node.meta.line,
                callee: callee.to_string(),
                model: self.named_string(arena, &args, "model"),
                temperature: self.named_number(arena, &args, "temperature"),
                has_error_handling: arena
                    .ancestors(id)
                    .any(|a| arena.nodes[a].kind == kind::TRY),
                has_grounding: self.grounding_in_args(arena, &args),
                has_validation: self.marker_near(
                    unit,
                    arena,
                    &args,
                    node.meta.line,
                    &self.patterns.validation_markers,
                ),
                has_response_validation: self.marker_near(
                    unit,
                    arena,
                    &args,
                    node.meta.line,
                    &self.patterns.response_validation_markers,
                ),
                from_fallback: false,
            });
        }
        out
    }

    /// Bounded-depth node set covering every argument subtree of a call.
    fn argument_nodes(&self, arena: &AstArena, call: NodeId) -> Vec<NodeId> {
        arena.nodes[call]
            .children
            .iter()
            .filter(|&&c| arena.nodes[c].kind == kind::ARGUMENT)
            .flat_map(|&c| arena.bounded(c, self.patterns.argument_depth))
            .collect()
    }

    /// Value of a named argument given as a string: a `Property` node whose
    /// key matches and whose child is a string literal, nested config
    /// objects included (covered by the bounded traversal).
    fn named_string(&self, arena: &AstArena, args: &[NodeId], name: &str) -> Option<String> {
        args.iter().find_map(|&id| {
            let node = &arena.nodes[id];
            if node.kind != kind::PROPERTY || node.value.as_str() != Some(name) {
                return None;
            }
            node.children.iter().find_map(|&c| {
                let child = &arena.nodes[c];
                (child.kind == kind::STRING)
                    .then(|| child.value.as_str().map(str::to_string))
                    .flatten()
            })
        })
    }

    fn named_number(&self, arena: &AstArena, args: &[NodeId], name: &str) -> Option<f64> {
        args.iter().find_map(|&id| {
            let node = &arena.nodes[id];
            if node.kind != kind::PROPERTY || node.value.as_str() != Some(name) {
                return None;
            }
            node.children.iter().find_map(|&c| {
                let child = &arena.nodes[c];
                (child.kind == kind::NUMBER).then(|| child.value.as_f64()).flatten()
            })
        })
    }

    fn grounding_in_args(&self, arena: &AstArena, args: &[NodeId]) -> bool {
        args.iter().any(|&id| {
            let node = &arena.nodes[id];
            if node.kind != kind::STRING {
                return false;
            }
            let Some(text) = node.value.as_str() else {
                return false;
            };
            let lower = text.to_lowercase();
            self.patterns
                .grounding_keywords
                .iter()
                .any(|k| lower.contains(&k.to_lowercase()))
        })
    }

    /// Marker in the argument subtree OR within the textual window around
    /// the call line. An intentional approximation, not true reachability.
    fn marker_near(
        &self,
        unit: &SourceUnit,
        arena: &AstArena,
        args: &[NodeId],
        line: usize,
        markers: &[String],
    ) -> bool {
        let in_args = args.iter().any(|&id| {
            arena.nodes[id]
                .value
                .as_str()
                .map(|v| markers.iter().any(|m| contains_ci(v, m)))
                .unwrap_or(false)
        });
        in_args || window_contains(unit, line, self.patterns.window_lines, markers)
    }

    /// Fallback path: line scan with the same window heuristics applied
    /// directly to source text.
    fn extract_from_text(&self, unit: &SourceUnit) -> Vec<CallSite> {
        let mut out = Vec::new();
        for (idx, line_text) in unit.content.lines().enumerate() {
            let Some(callee) = self.fallback_callee(line_text) else {
                continue;
            };
            let line = idx + 1;
            let window = window_text(unit, line, self.patterns.window_lines);
            out.push(CallSite {
                file: unit.path.clone(),
                line,
                callee,
                model: capture_after(&window, "model"),
                temperature: capture_after(&window, "temperature")
                    .and_then(|v| v.parse::<f64>().ok()),
                has_error_handling: window.contains("try")
                    || window.contains("catch")
                    || window.contains("except"),
                has_grounding: self
                    .patterns
                    .grounding_keywords
                    .iter()
                    .any(|k| contains_ci(&window, k)),
                has_validation: self
                    .patterns
                    .validation_markers
                    .iter()
                    .any(|m| contains_ci(&window, m)),
                has_response_validation: self
                    .patterns
                    .response_validation_markers
                    .iter()
                    .any(|m| contains_ci(&window, m)),
                from_fallback: true,
            });
        }
        out
    }

    /// Expands a pattern hit into the full dotted callee preceding `(`.
    fn fallback_callee(&self, line: &str) -> Option<String> {
        for pattern in &self.patterns.callee_patterns {
            let Some(pos) = line.find(pattern.as_str()) else {
                continue;
            };
            let after = &line[pos + pattern.len()..];
            if !after.trim_start().starts_with('(') {
                continue;
            }
            let start = line[..pos]
                .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.' || c == '$'))
                .map(|i| i + 1)
                .unwrap_or(0);
            return Some(line[start..pos + pattern.len()].to_string());
        }
        None
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn window_text(unit: &SourceUnit, line: usize, radius: usize) -> String {
    let lines: Vec<&str> = unit.content.lines().collect();
    let start = line.saturating_sub(radius + 1);
    let end = (line + radius).min(lines.len());
    lines[start..end].join("\n")
}

fn window_contains(unit: &SourceUnit, line: usize, radius: usize, markers: &[String]) -> bool {
    let window = window_text(unit, line, radius);
    markers.iter().any(|m| contains_ci(&window, m))
}

/// Captures `name: "value"` / `name = value` style facts from a window.
fn capture_after(window: &str, name: &str) -> Option<String> {
    let pos = window.find(name)?;
    let rest = window[pos + name.len()..].trim_start();
    let rest = rest.strip_prefix(':').or_else(|| rest.strip_prefix('='))?;
    let rest = rest.trim_start();
    if let Some(stripped) = rest.strip_prefix('"').or_else(|| rest.strip_prefix('\'')) {
        let end = stripped.find(['"', '\''])?;
        Some(stripped[..end].to_string())
    } else {
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '.' || c == '-'))
            .unwrap_or(rest.len());
        (end > 0).then(|| rest[..end].to_string())
    }
}
