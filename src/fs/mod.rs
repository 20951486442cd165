/// File system operations abstraction for testing
///
/// Every durable document the monitor touches (state, logs, handoff
/// messages, heartbeat) goes through this trait so that failures can be
/// injected with `mockall` in tests.
///
/// # Examples
///
/// ```rust,no_run
/// use audit_handoff::fs::{FileSystemOperations, StandardFileSystem};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let fs_ops: Arc<dyn FileSystemOperations> = Arc::new(StandardFileSystem);
///
///     fs_ops.create_dir_all(Path::new(".handoff/events")).await?;
///     fs_ops
///         .write_atomic(Path::new(".handoff/events/executor-state.json"), b"{}")
///         .await?;
///
///     if let Some(contents) = fs_ops
///         .read_to_string(Path::new(".handoff/events/executor-state.json"))
///         .await?
///     {
///         println!("state: {contents}");
///     }
///
///     Ok(())
/// }
/// ```
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[cfg(test)]
use mockall::automock;

/// Trait for file system operations that can be mocked in tests
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait FileSystemOperations: Send + Sync {
    /// Create a directory and all its parent directories
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read a whole file as UTF-8. A missing file is `Ok(None)`, not an error.
    async fn read_to_string(&self, path: &Path) -> Result<Option<String>>;

    /// Replace the file contents by writing a sibling temporary file and
    /// renaming it over the target, so readers never observe a partial write.
    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Append to a file, creating it if needed
    async fn append(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// File names (not full paths) of the regular files in a directory
    async fn list_file_names(&self, dir: &Path) -> Result<Vec<String>>;
}

/// Standard implementation that uses actual file system operations
pub struct StandardFileSystem;

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait::async_trait]
impl FileSystemOperations for StandardFileSystem {
    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path).await.map_err(Into::into)
    }

    async fn read_to_string(&self, path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let temp_file = temp_path_for(path);
        tokio::fs::write(&temp_file, contents).await?;
        tokio::fs::rename(&temp_file, path).await?;
        Ok(())
    }

    async fn append(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(contents).await?;
        file.flush().await?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    async fn list_file_names(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}
