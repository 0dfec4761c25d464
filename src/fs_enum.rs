use crate::error::{UploadError, UploadResult};
use std::path::{Path, PathBuf};
// One-level directory listing for the tree walker

/// One file to send: the walked root plus the path relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTarget {
    pub root: PathBuf,
    pub relative: PathBuf,
}

impl TransferTarget {
    pub fn new(root: impl Into<PathBuf>, relative: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            relative: relative.into(),
        }
    }

    /// Target for a single file given by its own path
    pub fn for_file(path: &Path) -> Option<Self> {
        let name = path.file_name()?;
        let root = path.parent().unwrap_or_else(|| Path::new(""));
        Some(Self::new(root, name))
    }

    pub fn local_path(&self) -> PathBuf {
        self.root.join(&self.relative)
    }
}

/// A directory entry as the walker sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listed {
    Dir(String),
    File(String),
    Skipped { name: String, reason: &'static str },
}

impl Listed {
    pub fn name(&self) -> &str {
        match self {
            Listed::Dir(n) | Listed::File(n) => n,
            Listed::Skipped { name, .. } => name,
        }
    }
}

/// List the direct children of `dir`, sorted by file name.
///
/// Symlinks to regular files count as files. Symlinks to directories and
/// special files (sockets, fifos, devices) are reported as skipped.
pub fn list_dir(dir: &Path) -> UploadResult<Vec<Listed>> {
    use walkdir::WalkDir;

    let read_err = |source: std::io::Error| UploadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    // walkdir silently yields nothing for a non-directory root at min_depth(1)
    let meta = std::fs::metadata(dir).map_err(read_err)?;
    if !meta.is_dir() {
        return Err(read_err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "not a directory",
        )));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| read_err(e.into()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let ft = entry.file_type();

        let listed = if ft.is_dir() {
            Listed::Dir(name)
        } else if ft.is_file() {
            Listed::File(name)
        } else if ft.is_symlink() {
            match std::fs::metadata(entry.path()) {
                Ok(target) if target.is_file() => Listed::File(name),
                Ok(target) if target.is_dir() => Listed::Skipped {
                    name,
                    reason: "symlink to directory",
                },
                Ok(_) => Listed::Skipped {
                    name,
                    reason: "symlink to special file",
                },
                Err(_) => Listed::Skipped {
                    name,
                    reason: "dangling symlink",
                },
            }
        } else {
            Listed::Skipped {
                name,
                reason: "not a regular file",
            }
        };
        entries.push(listed);
    }

    Ok(entries)
}

/// Same as [`list_dir`] but off the async worker threads
pub async fn list_dir_async(dir: PathBuf) -> UploadResult<Vec<Listed>> {
    tokio::task::spawn_blocking(move || list_dir(&dir))
        .await
        .map_err(UploadError::Task)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_list_dir_sorted_and_classified() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.txt"), "b").unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        fs::create_dir(tmp.path().join("c")).unwrap();
        fs::write(tmp.path().join("c/nested.txt"), "n").unwrap();

        let listed = list_dir(tmp.path()).unwrap();
        assert_eq!(
            listed,
            vec![
                Listed::File("a.txt".into()),
                Listed::File("b.txt".into()),
                Listed::Dir("c".into()),
            ]
        );
    }

    #[test]
    fn test_list_dir_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(list_dir(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_list_dir_missing_is_read_dir_error() {
        let tmp = TempDir::new().unwrap();
        let err = list_dir(&tmp.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadDir);
    }

    #[test]
    fn test_list_dir_on_file_is_read_dir_error() {
        let tmp = TempDir::new().unwrap();
        let f = tmp.path().join("f.txt");
        fs::write(&f, "x").unwrap();
        assert_eq!(list_dir(&f).unwrap_err().kind(), ErrorKind::ReadDir);
    }

    #[cfg(unix)]
    #[test]
    fn test_list_dir_symlinks() {
        use std::os::unix::fs::symlink;
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("real.txt"), "r").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        symlink(tmp.path().join("real.txt"), tmp.path().join("link.txt")).unwrap();
        symlink(tmp.path().join("sub"), tmp.path().join("loop")).unwrap();
        symlink(tmp.path().join("gone"), tmp.path().join("dangling")).unwrap();

        let listed = list_dir(tmp.path()).unwrap();
        assert!(listed.contains(&Listed::File("link.txt".into())));
        assert!(listed.contains(&Listed::Skipped {
            name: "loop".into(),
            reason: "symlink to directory"
        }));
        assert!(listed.contains(&Listed::Skipped {
            name: "dangling".into(),
            reason: "dangling symlink"
        }));
        assert!(listed.contains(&Listed::Dir("sub".into())));
    }

    #[test]
    fn test_transfer_target_paths() {
        let t = TransferTarget::for_file(Path::new("/tmp/single.txt")).unwrap();
        assert_eq!(t.root, PathBuf::from("/tmp"));
        assert_eq!(t.relative, PathBuf::from("single.txt"));
        assert_eq!(t.local_path(), PathBuf::from("/tmp/single.txt"));

        let t = TransferTarget::for_file(Path::new("bare.txt")).unwrap();
        assert_eq!(t.local_path(), PathBuf::from("bare.txt"));

        let t = TransferTarget::new("/data", "a/b/c.bin");
        assert_eq!(t.local_path(), PathBuf::from("/data/a/b/c.bin"));
    }
}
