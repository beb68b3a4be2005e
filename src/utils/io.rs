//! File I/O primitives shared by the parameters.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::Result;

pub fn read_file(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    Ok(fs::write(path, content)?)
}

/// Remove every entry inside `path`, keeping the directory itself.
pub fn clear_directory(path: &Path) -> Result<()> {
    for entry in fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_dir() {
            fs::remove_dir_all(&entry_path)?;
        } else {
            fs::remove_file(&entry_path)?;
        }
    }
    Ok(())
}

/// Collect all files with the given extension under `root`, recursively,
/// in stable sorted order.
pub fn collect_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect_into(root, extension, &mut found)?;
    found.sort();
    Ok(found)
}

fn collect_into(dir: &Path, extension: &str, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_into(&path, extension, found)?;
        } else if path.extension().and_then(OsStr::to_str) == Some(extension) {
            found.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_directory_removes_files_and_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/b.txt"), "b").unwrap();

        clear_directory(dir.path()).unwrap();

        assert!(dir.path().exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn collect_files_recurses_and_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.dsl"), "module A;").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/extra.dsl"), "module B;").unwrap();

        let files = collect_files(dir.path(), "dsl").unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "dsl"));
    }

    #[test]
    fn collect_files_on_missing_directory_errors() {
        assert!(collect_files(Path::new("/no/such/dir"), "dsl").is_err());
    }
}
