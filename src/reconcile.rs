//! Removing output files a full build neither produced nor kept.

use crate::log;
use crate::renderers::KeptPaths;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Delete every file under `output_root` missing from `kept`, then any
/// directory left empty. Returns the deleted files.
///
/// Only sound after a full build: every renderer must have reported every
/// output it wrote or kept.
pub fn reconcile(output_root: &Path, kept: &KeptPaths) -> Result<Vec<PathBuf>> {
    if !output_root.exists() {
        return Ok(Vec::new());
    }

    let mut deleted = Vec::new();
    for entry in WalkDir::new(output_root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || kept.contains(path) {
            continue;
        }
        log!("warn"; "deleting stale output file {}", path.display());
        fs::remove_file(path).with_context(|| format!("failed to delete {}", path.display()))?;
        deleted.push(path.to_path_buf());
    }

    remove_empty_dirs(output_root);
    Ok(deleted)
}

/// Deepest first, so nested empty directories collapse. The root stays.
fn remove_empty_dirs(root: &Path) {
    let dirs: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    for dir in dirs {
        // Fails on non-empty directories, which is what we want
        let _ = fs::remove_dir(&dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, rel).unwrap();
        path
    }

    #[test]
    fn test_deletes_only_unkept_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let keep = write(root, "blog/hello.html");
        write(root, "blog/old.html");
        write(root, "gone/deep/x.css");

        let kept: KeptPaths = [keep.clone()].into_iter().collect();
        let mut deleted = reconcile(root, &kept).unwrap();
        deleted.sort();

        assert_eq!(deleted, vec![root.join("blog/old.html"), root.join("gone/deep/x.css")]);
        assert!(keep.exists());
        assert!(!root.join("gone").exists());
        assert!(root.exists());
    }

    #[test]
    fn test_missing_output_root() {
        let dir = TempDir::new().unwrap();
        let deleted = reconcile(&dir.path().join("nope"), &KeptPaths::default()).unwrap();
        assert!(deleted.is_empty());
    }
}
