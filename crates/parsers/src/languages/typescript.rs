//! TypeScript adapter backed by the tree-sitter grammar. `.tsx` units go
//! through the TSX grammar variant.

use super::{ecma, imports_from_arena, LanguageAdapter};
use anyhow::anyhow;
use ir::{AstArena, Language, SourceUnit};

pub struct TypeScriptAdapter;

impl LanguageAdapter for TypeScriptAdapter {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn parse(&self, unit: &SourceUnit) -> anyhow::Result<AstArena> {
        let grammar = if unit.path.ends_with(".tsx") {
            tree_sitter_typescript::language_tsx()
        } else {
            tree_sitter_typescript::language_typescript()
        };
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(grammar)
            .map_err(|e| anyhow!("typescript grammar: {e}"))?;
        let tree = parser
            .parse(&unit.content, None)
            .ok_or_else(|| anyhow!("typescript parse failed: {}", unit.path))?;
        Ok(ecma::build_arena(tree.root_node(), &unit.content, &unit.path))
    }

    fn extract_imports(&self, unit: &SourceUnit, arena: Option<&AstArena>) -> Vec<String> {
        match arena {
            Some(a) => imports_from_arena(a),
            None => match self.parse(unit) {
                Ok(a) => imports_from_arena(&a),
                Err(_) => super::fallback::imports_from_text(&unit.content),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir::ast::kind;

    fn unit(content: &str) -> SourceUnit {
        SourceUnit {
            path: "app.ts".into(),
            language: Language::TypeScript,
            content: content.into(),
        }
    }

    #[test]
    fn resolves_member_chain_callees() {
        let arena = TypeScriptAdapter.parse(&unit(
            "const r = await client.chat.completions.create({ model: 'gpt-4o' });\n",
        ))
        .unwrap();
        let callee = arena
            .nodes
            .iter()
            .find(|n| n.kind == kind::CALL)
            .and_then(|n| n.value.as_str().map(str::to_string))
            .unwrap();
        assert_eq!(callee, "client.chat.completions.create");
    }

    #[test]
    fn call_arguments_hang_under_argument_nodes() {
        let arena = TypeScriptAdapter.parse(&unit("run(userInput, 2);\n")).unwrap();
        let call = arena
            .nodes
            .iter()
            .position(|n| n.kind == kind::CALL)
            .unwrap();
        let args: Vec<_> = arena.nodes[call]
            .children
            .iter()
            .filter(|&&c| arena.nodes[c].kind == kind::ARGUMENT)
            .collect();
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn try_blocks_appear_in_ancestor_chain() {
        let arena = TypeScriptAdapter.parse(&unit(
            "try { risky(); } catch (e) { console.error(e); }\n",
        ))
        .unwrap();
        let call = arena
            .nodes
            .iter()
            .position(|n| n.kind == kind::CALL && n.value == serde_json::json!("risky"))
            .unwrap();
        assert!(arena
            .ancestors(call)
            .any(|id| arena.nodes[id].kind == kind::TRY));
    }

    #[test]
    fn extracts_imports_structurally() {
        let u = unit("import { api } from './api';\nimport 'reflect-metadata';\n");
        let imports = TypeScriptAdapter.extract_imports(&u, None);
        assert_eq!(imports, vec!["./api".to_string(), "reflect-metadata".to_string()]);
    }

    #[test]
    fn function_parameters_become_parameter_nodes() {
        let arena = TypeScriptAdapter.parse(&unit(
            "function handle(userInput: string, limit = 5) { return userInput; }\n",
        ))
        .unwrap();
        let params: Vec<_> = arena
            .nodes
            .iter()
            .filter(|n| n.kind == kind::PARAMETER)
            .filter_map(|n| n.value.as_str())
            .collect();
        assert!(params.contains(&"userInput"));
    }
}
