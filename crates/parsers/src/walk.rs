//! Breadth-first project traversal with a fixed exclusion list.
//!
//! Build, output and dependency directories never contribute source units;
//! symlinks are skipped so cyclic links cannot loop the scan. The returned
//! list is sorted so downstream passes see files in a stable order.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory names that never contain project sources.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    ".next",
    "coverage",
    "__pycache__",
    ".venv",
    "venv",
    "vendor",
];

fn excluded(path: &Path, extra: &[String]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    DEFAULT_EXCLUDES.contains(&name) || extra.iter().any(|e| e == name)
}

/// Collects every regular file under `root`, honouring the exclusion list.
/// Permission errors on individual entries are skipped, not fatal.
pub fn walk_files(root: &Path, extra_excludes: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending: VecDeque<PathBuf> = VecDeque::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    pending.push_back(root.to_path_buf());

    while let Some(current) = pending.pop_front() {
        if !visited.insert(current.clone()) {
            continue;
        }
        if excluded(&current, extra_excludes) {
            debug!(path = %current.display(), "Path excluded");
            continue;
        }
        let metadata = match fs::symlink_metadata(&current) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                debug!(path = %current.display(), "Permission denied");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            debug!(path = %current.display(), "Symlink skipped");
            continue;
        }
        if file_type.is_file() {
            files.push(current);
        } else if file_type.is_dir() {
            let entries = match fs::read_dir(&current) {
                Ok(e) => e,
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    debug!(path = %current.display(), "Permission denied");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            for entry in entries.flatten() {
                pending.push_back(entry.path());
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn collects_nested_files_in_sorted_order() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        fs::create_dir_all(base.join("src/deep")).unwrap();
        fs::write(base.join("src/deep/z.ts"), b"").unwrap();
        fs::write(base.join("src/a.ts"), b"").unwrap();
        fs::write(base.join("readme.md"), b"").unwrap();

        let files = walk_files(base, &[]).unwrap();
        let rel: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(base).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("readme.md"),
                PathBuf::from("src/a.ts"),
                PathBuf::from("src/deep/z.ts"),
            ]
        );
    }

    #[test]
    fn skips_default_excluded_directories() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        fs::create_dir_all(base.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(base.join("__pycache__")).unwrap();
        fs::write(base.join("node_modules/pkg/index.js"), b"").unwrap();
        fs::write(base.join("__pycache__/mod.pyc"), b"").unwrap();
        fs::write(base.join("app.py"), b"").unwrap();

        let files = walk_files(base, &[]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app.py"));
    }

    #[test]
    fn honours_extra_excludes() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        fs::create_dir_all(base.join("generated")).unwrap();
        fs::write(base.join("generated/api.ts"), b"").unwrap();
        fs::write(base.join("main.ts"), b"").unwrap();

        let files = walk_files(base, &["generated".to_string()]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.ts"));
    }

    #[cfg(unix)]
    #[test]
    fn terminates_on_symlink_loop() {
        use std::os::unix::fs as unix_fs;

        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        fs::create_dir_all(base.join("a")).unwrap();
        fs::write(base.join("a/file.ts"), b"").unwrap();
        unix_fs::symlink(base, base.join("a/loop")).unwrap();

        let files = walk_files(base, &[]).unwrap();
        assert_eq!(files.len(), 1);
    }
}
