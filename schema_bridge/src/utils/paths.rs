//! Database file identity
//!
//! Two spellings of a path can name the same file through `..`, symlinks or a
//! relative/absolute mismatch. Paths are resolved before they are compared.

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Resolve `path` to an absolute path without requiring it to exist.
///
/// Existing paths are canonicalized. Otherwise the path is normalized
/// lexically and its parent directory canonicalized if that exists.
pub fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }

    let normalized = normalize(path);
    match (normalized.parent(), normalized.file_name()) {
        (Some(parent), Some(name)) => match fs::canonicalize(parent) {
            Ok(parent) => parent.join(name),
            Err(_) => normalized,
        },
        _ => normalized,
    }
}

/// Whether `a` and `b` refer to the same database file
pub fn same_file(a: &Path, b: &Path) -> bool {
    if resolve_path(a) == resolve_path(b) {
        return true;
    }
    same_inode(a, b)
}

#[cfg(unix)]
fn same_inode(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_inode(_a: &Path, _b: &Path) -> bool {
    false
}

fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn parent_segments_resolve_to_the_same_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("db.sqlite3");
        fs::write(&file, b"").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        assert!(same_file(&file, &dir.path().join("sub/../db.sqlite3")));
        assert!(same_file(&file, &dir.path().join("./db.sqlite3")));
        assert!(!same_file(&file, &dir.path().join("other.sqlite3")));
    }

    #[test]
    fn missing_paths_are_normalized_lexically() {
        let dir = tempdir().unwrap();
        let base = fs::canonicalize(dir.path()).unwrap();

        assert_eq!(
            resolve_path(&dir.path().join("absent/../new.sqlite3")),
            base.join("new.sqlite3")
        );
        assert_eq!(resolve_path(&dir.path().join("new.sqlite3")), base.join("new.sqlite3"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_and_hard_links_are_the_same_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("db.sqlite3");
        fs::write(&file, b"").unwrap();
        let symlink = dir.path().join("alias.sqlite3");
        std::os::unix::fs::symlink(&file, &symlink).unwrap();
        let hard_link = dir.path().join("hard.sqlite3");
        fs::hard_link(&file, &hard_link).unwrap();

        assert!(same_file(&file, &symlink));
        assert!(same_file(&file, &hard_link));
    }
}
