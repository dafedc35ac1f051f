//! Handle capabilities over the local filesystem.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use compact_str::CompactString;
use tokio::fs;
use tracing::debug;

use sweepfile_core::{
    ChildEntry, DirectoryHandle, EntryKind, FileHandle, FileMetadata, ScanError,
};

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Error for a child looked up by name.
///
/// Names that are not valid UTF-8 are listed lossily and cannot be opened
/// again, so a miss on such a name is reported as unsupported.
fn lookup_error(path: &Path, name: &str, err: io::Error) -> ScanError {
    if err.kind() == io::ErrorKind::NotFound && name.contains(char::REPLACEMENT_CHARACTER) {
        return ScanError::Unsupported {
            path: display(path),
            reason: "file name is not valid UTF-8".to_string(),
        };
    }
    ScanError::io(display(path), err)
}

fn name_of(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
}

/// A directory on the local filesystem.
///
/// Symbolic links are never followed: they are listed as files, and their
/// content cannot be read.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    name: CompactString,
    path: PathBuf,
}

impl LocalDirectory {
    /// Open a root directory.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let path = fs::canonicalize(path)
            .await
            .map_err(|e| ScanError::io(display(path), e))?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| ScanError::io(display(&path), e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: display(&path),
            });
        }

        Ok(Self {
            name: name_of(&path),
            path,
        })
    }

    /// Absolute path of this directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DirectoryHandle for LocalDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_children(&self) -> Result<Vec<ChildEntry>, ScanError> {
        let mut read_dir = fs::read_dir(&self.path)
            .await
            .map_err(|e| ScanError::io(display(&self.path), e))?;

        let mut children = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| ScanError::io(display(&self.path), e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| ScanError::io(display(&entry.path()), e))?;
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if file_name.to_str().is_none() {
                debug!(path = %crate::local::display(&entry.path()), "non-UTF-8 name");
            }
            children.push(ChildEntry::new(name.as_ref(), kind));
        }

        Ok(children)
    }

    async fn open_file(&self, name: &str) -> Result<Arc<dyn FileHandle>, ScanError> {
        let path = self.path.join(name);
        let metadata = fs::symlink_metadata(&path)
            .await
            .map_err(|e| lookup_error(&path, name, e))?;
        if metadata.is_dir() {
            return Err(ScanError::Unsupported {
                path: display(&path),
                reason: "is a directory".to_string(),
            });
        }

        Ok(Arc::new(LocalFile {
            name: name.into(),
            is_symlink: metadata.file_type().is_symlink(),
            path,
        }))
    }

    async fn open_directory(&self, name: &str) -> Result<Arc<dyn DirectoryHandle>, ScanError> {
        let path = self.path.join(name);
        let metadata = fs::symlink_metadata(&path)
            .await
            .map_err(|e| lookup_error(&path, name, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: display(&path),
            });
        }

        Ok(Arc::new(LocalDirectory {
            name: name.into(),
            path,
        }))
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<(), ScanError> {
        let path = self.path.join(name);
        let metadata = fs::symlink_metadata(&path)
            .await
            .map_err(|e| lookup_error(&path, name, e))?;

        let result = if metadata.is_dir() {
            if recursive {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_dir(&path).await
            }
        } else {
            fs::remove_file(&path).await
        };
        result.map_err(|e| ScanError::io(display(&path), e))
    }
}

/// A file on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFile {
    name: CompactString,
    path: PathBuf,
    is_symlink: bool,
}

impl LocalFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileHandle for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn metadata(&self) -> Result<FileMetadata, ScanError> {
        let metadata = fs::symlink_metadata(&self.path)
            .await
            .map_err(|e| ScanError::io(display(&self.path), e))?;
        Ok(FileMetadata {
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
        })
    }

    async fn read_all(&self) -> Result<Vec<u8>, ScanError> {
        if self.is_symlink {
            return Err(ScanError::Unsupported {
                path: display(&self.path),
                reason: "symbolic links are not followed".to_string(),
            });
        }
        fs::read(&self.path)
            .await
            .map_err(|e| ScanError::io(display(&self.path), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_rejects_file_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();

        let err = LocalDirectory::open(&file).await.unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory { .. }));
    }

    #[tokio::test]
    async fn test_list_open_and_remove() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        std::fs::write(temp.path().join("sub/inner.txt"), "inner").unwrap();
        std::fs::write(temp.path().join("a.txt"), "hello").unwrap();

        let root = LocalDirectory::open(temp.path()).await.unwrap();
        let mut children = root.list_children().await.unwrap();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            children,
            vec![ChildEntry::file("a.txt"), ChildEntry::directory("sub")]
        );

        let file = root.open_file("a.txt").await.unwrap();
        assert_eq!(file.metadata().await.unwrap().size, 5);
        assert_eq!(file.read_all().await.unwrap(), b"hello");

        // Non-recursive removal of a non-empty directory fails
        assert!(root.remove_entry("sub", false).await.is_err());
        root.remove_entry("sub", true).await.unwrap();
        assert!(!temp.path().join("sub").exists());

        let err = root.remove_entry("sub", true).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_non_utf8_name_is_unsupported() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let raw = OsStr::from_bytes(b"bad\xff.txt");
        std::fs::write(temp.path().join(raw), "x").unwrap();

        let root = LocalDirectory::open(temp.path()).await.unwrap();
        let children = root.list_children().await.unwrap();
        assert_eq!(children, vec![ChildEntry::file("bad\u{FFFD}.txt")]);

        let err = root.open_file(&children[0].name).await.unwrap_err();
        assert!(matches!(err, ScanError::Unsupported { .. }));
        assert_eq!(err.warning_kind(), sweepfile_core::WarningKind::Unsupported);

        let err = root.open_file("plain-missing.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_not_followed() {
        let temp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.path().join("link")).unwrap();

        let root = LocalDirectory::open(temp.path()).await.unwrap();
        let children = root.list_children().await.unwrap();
        assert_eq!(children, vec![ChildEntry::file("link")]);

        let link = root.open_file("link").await.unwrap();
        let err = link.read_all().await.unwrap_err();
        assert!(matches!(err, ScanError::Unsupported { .. }));

        // Removing the link leaves the target alone
        root.remove_entry("link", false).await.unwrap();
        assert!(outside.path().join("secret.txt").exists());
    }
}
