//! JavaScript adapter. Shares the ECMAScript walker with TypeScript.

use super::{ecma, imports_from_arena, LanguageAdapter};
use anyhow::anyhow;
use ir::{AstArena, Language, SourceUnit};

pub struct JavaScriptAdapter;

impl LanguageAdapter for JavaScriptAdapter {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn parse(&self, unit: &SourceUnit) -> anyhow::Result<AstArena> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(tree_sitter_javascript::language())
            .map_err(|e| anyhow!("javascript grammar: {e}"))?;
        let tree = parser
            .parse(&unit.content, None)
            .ok_or_else(|| anyhow!("javascript parse failed: {}", unit.path))?;
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

    #[test]
    fn parses_and_extracts_relative_imports() {
        let unit = SourceUnit {
            path: "index.js".into(),
            language: Language::JavaScript,
            content: "import util from '../lib/util';\nutil.run();\n".into(),
        };
        let arena = JavaScriptAdapter.parse(&unit).unwrap();
        assert!(arena.nodes.iter().any(|n| n.kind == kind::CALL));
        let imports = JavaScriptAdapter.extract_imports(&unit, Some(&arena));
        assert_eq!(imports, vec!["../lib/util".to_string()]);
    }
}
