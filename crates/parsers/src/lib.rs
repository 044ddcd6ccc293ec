//! Source scanning and conversion of project files into the codepulse IR.
//!
//! The scanner walks a project tree with a fixed exclusion list and produces
//! [`SourceUnit`]s; a [`LanguageAdapter`] per supported language turns each
//! unit into a normalised [`AstArena`]. Languages without a grammar go
//! through the regex fallback adapter, which cannot parse but still yields
//! deterministic import extraction.

use anyhow::Context;
use ir::{AstArena, Language, SourceUnit};
use std::fs;
use std::path::Path;
use tracing::debug;

pub mod languages;
mod walk;

pub use languages::{adapter_for, LanguageAdapter};
pub use walk::{walk_files, DEFAULT_EXCLUDES};

/// Determines the language tag from the file extension.
///
/// # Example
/// ```
/// use parsers::detect_language;
/// use ir::Language;
/// assert_eq!(detect_language(std::path::Path::new("a.tsx")), Some(Language::TypeScript));
/// assert_eq!(detect_language(std::path::Path::new("a.lock")), None);
/// ```
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "ts" | "tsx" => Some(Language::TypeScript),
        "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
        "py" => Some(Language::Python),
        "vue" | "svelte" => Some(Language::Other),
        _ => None,
    }
}

/// Walks `root` and reads every recognised source file into a [`SourceUnit`].
/// Paths are stored relative to `root` with forward slashes so reports stay
/// stable across platforms.
pub fn scan_project(root: &Path, extra_excludes: &[String]) -> anyhow::Result<Vec<SourceUnit>> {
    let mut units = Vec::new();
    for path in walk_files(root, extra_excludes)? {
        let Some(language) = detect_language(&path) else {
            continue;
        };
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "Unreadable file skipped");
                continue;
            }
        };
        let rel = path
            .strip_prefix(root)
            .with_context(|| format!("file outside project root: {}", path.display()))?;
        let rel = rel.to_string_lossy().replace('\\', "/");
        debug!(file = %rel, language = %language, "Source unit discovered");
        units.push(SourceUnit {
            path: rel,
            language,
            content,
        });
    }
    Ok(units)
}

/// Parses a unit through its language adapter. Parse failures are a normal
/// outcome: the caller takes the regex fallback path on `None`.
pub fn parse_unit(unit: &SourceUnit) -> Option<AstArena> {
    match adapter_for(unit.language).parse(unit) {
        Ok(arena) => Some(arena),
        Err(e) => {
            debug!(file = %unit.path, error = %e, "Parse failed, fallback path");
            None
        }
    }
}
