//! Filesystem helpers shared by file steps and the build pipeline

use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Copy a directory tree, creating destination directories as needed.
pub fn copy_tree(source: &Path, dest: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Move a file or directory, falling back to copy-and-delete when a
/// plain rename crosses filesystems.
pub fn move_path(source: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            if source.is_dir() {
                copy_tree(source, dest)?;
                fs::remove_dir_all(source)
            } else {
                fs::copy(source, dest)?;
                fs::remove_file(source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_tree_preserves_layout() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        fs::write(src.join("nested/b.txt"), "b").unwrap();

        let dst = dir.path().join("dst");
        copy_tree(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dst.join("nested/b.txt")).unwrap(), "b");
    }

    #[test]
    fn test_move_path_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("artifact.apk");
        fs::write(&src, "bytes").unwrap();

        let dst = dir.path().join("out/artifact.apk");
        fs::create_dir_all(dst.parent().unwrap()).unwrap();
        move_path(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "bytes");
    }
}
