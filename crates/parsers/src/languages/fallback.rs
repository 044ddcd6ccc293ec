//! Regex fallback for languages without a grammar adapter (and for grammar
//! units whose parse failed). Cannot produce an arena; import extraction
//! runs a single compiled pattern over raw text and is deterministic.

use super::LanguageAdapter;
use anyhow::anyhow;
use ir::{AstArena, Language, SourceUnit};
use regex::Regex;
use std::sync::OnceLock;

/// Matches both `import … from '<path>'` and bare `import '<path>'`.
fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*import\s+(?:[^'"\n]+?\s+from\s+)?['"]([^'"]+)['"]"#)
            .expect("valid import regex")
    })
}

/// Import targets found in raw text, restricted to relative or alias-rooted
/// paths. Third-party package names are not tracked.
pub fn imports_from_text(content: &str) -> Vec<String> {
    import_re()
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .filter(|t| t.starts_with('.') || t.starts_with("@/") || t.starts_with("~/"))
        .collect()
}

pub struct FallbackAdapter;

impl LanguageAdapter for FallbackAdapter {
    fn language(&self) -> Language {
        Language::Other
    }

    fn parse(&self, unit: &SourceUnit) -> anyhow::Result<AstArena> {
        Err(anyhow!("no grammar for {}", unit.path))
    }

    fn extract_imports(&self, unit: &SourceUnit, _arena: Option<&AstArena>) -> Vec<String> {
        imports_from_text(&unit.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_both_import_forms() {
        let src = "import { a } from './a';\nimport './side-effect';\nimport x from '@/alias/x';\n";
        assert_eq!(
            imports_from_text(src),
            vec!["./a".to_string(), "./side-effect".to_string(), "@/alias/x".to_string()]
        );
    }

    #[test]
    fn drops_third_party_packages() {
        let src = "import React from 'react';\nimport { z } from 'zod';\n";
        assert!(imports_from_text(src).is_empty());
    }
}
