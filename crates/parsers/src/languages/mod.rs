//! One adapter per supported language plus a regex fallback.
//!
//! Adapters share a single capability interface so the analysis passes are
//! language-agnostic: `parse` yields the normalised arena, `extract_imports`
//! yields raw import targets. Grammar-based adapters extract imports
//! structurally; the fallback matches import syntax over raw text.

use ir::{AstArena, Language, SourceUnit};

mod ecma;
pub mod fallback;
pub mod javascript;
pub mod python;
pub mod typescript;

pub use fallback::FallbackAdapter;
pub use javascript::JavaScriptAdapter;
pub use python::PythonAdapter;
pub use typescript::TypeScriptAdapter;

/// Capability interface implemented by every language adapter.
pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// Parses the unit into the normalised arena. An error means the caller
    /// should continue on the regex fallback path; it is never fatal.
    fn parse(&self, unit: &SourceUnit) -> anyhow::Result<AstArena>;

    /// Raw import targets of the unit. When an arena for this unit is
    /// already available, pass it to avoid re-parsing.
    fn extract_imports(&self, unit: &SourceUnit, arena: Option<&AstArena>) -> Vec<String>;
}

static TYPESCRIPT: TypeScriptAdapter = TypeScriptAdapter;
static JAVASCRIPT: JavaScriptAdapter = JavaScriptAdapter;
static PYTHON: PythonAdapter = PythonAdapter;
static FALLBACK: FallbackAdapter = FallbackAdapter;

/// Returns the adapter responsible for `language`.
pub fn adapter_for(language: Language) -> &'static dyn LanguageAdapter {
    match language {
        Language::TypeScript => &TYPESCRIPT,
        Language::JavaScript => &JAVASCRIPT,
        Language::Python => &PYTHON,
        Language::Other => &FALLBACK,
    }
}

/// Collects the targets of every `ImportStatement` node in an arena.
pub(crate) fn imports_from_arena(arena: &AstArena) -> Vec<String> {
    arena
        .preorder_all()
        .into_iter()
        .filter_map(|id| {
            let node = arena.get(id)?;
            if node.kind == ir::ast::kind::IMPORT {
                node.value.as_str().map(str::to_string)
            } else {
                None
            }
        })
        .collect()
}
