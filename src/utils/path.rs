//! Path helpers: relative uris, ignore rules, and directory traversal.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Files to ignore during directory traversal
pub const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Check if path is a temp/backup file (editor artifacts).
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Whether a path relative to a source root should never be built.
///
/// Hidden components (`.git/`, `.cache/`) and editor artifacts are skipped.
pub fn is_ignored(rel: &Path) -> bool {
    rel.components().any(|c| match c {
        Component::Normal(name) => name.to_str().is_none_or(|n| n.starts_with('.')),
        _ => false,
    }) || is_temp_file(rel)
}

/// Partials (`_layout.html`) are only ever used from other templates.
pub fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Slash-separated path of `path` relative to `root`.
///
/// Returns `None` when `path` is outside `root` or not valid UTF-8.
pub fn rel_uri(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts = rel
        .components()
        .map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Collect all buildable files under `dir`, sorted by path.
///
/// A missing directory yields an empty list.
pub fn collect_all_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_name().to_str().is_none_or(|n| n.starts_with('.'))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name) && !is_temp_file(e.path())
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

/// Copy `src` to `dst`, creating parent directories.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    ensure_parent(dst)?;
    fs::copy(src, dst)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_temp_file() {
        assert!(is_temp_file(Path::new("post.md.swp")));
        assert!(is_temp_file(Path::new("post.md~")));
        assert!(is_temp_file(Path::new(".#post.md")));
        assert!(is_temp_file(Path::new("draft.tmp")));
        assert!(!is_temp_file(Path::new("post.md")));
    }

    #[test]
    fn test_is_ignored() {
        assert!(is_ignored(Path::new(".git/config")));
        assert!(is_ignored(Path::new("blog/.drafts/a.md")));
        assert!(is_ignored(Path::new("blog/a.md.swp")));
        assert!(!is_ignored(Path::new("blog/a.md")));
    }

    #[test]
    fn test_is_partial() {
        assert!(is_partial(Path::new("_layout.html")));
        assert!(is_partial(Path::new("blog/_nav.html")));
        assert!(!is_partial(Path::new("blog/entry.html")));
    }

    #[test]
    fn test_rel_uri() {
        let root = Path::new("/site/content");
        assert_eq!(
            rel_uri(Path::new("/site/content/blog/hello.md"), root).as_deref(),
            Some("blog/hello.md")
        );
        assert_eq!(rel_uri(Path::new("/elsewhere/a.md"), root), None);
        assert_eq!(rel_uri(root, root), None);
    }

    #[test]
    fn test_collect_all_files_skips_hidden() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("blog/.drafts")).unwrap();
        fs::write(root.join("blog/b.md"), "b").unwrap();
        fs::write(root.join("a.md"), "a").unwrap();
        fs::write(root.join("blog/.drafts/c.md"), "c").unwrap();
        fs::write(root.join(".DS_Store"), "").unwrap();
        fs::write(root.join("a.md.swp"), "").unwrap();

        let files = collect_all_files(root);
        assert_eq!(files, vec![root.join("a.md"), root.join("blog/b.md")]);
    }

    #[test]
    fn test_collect_missing_dir() {
        assert!(collect_all_files(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn test_copy_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.zip");
        fs::write(&src, "zip").unwrap();
        let dst = dir.path().join("out/deep/a.zip");

        copy_file(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(dst).unwrap(), "zip");
    }
}
