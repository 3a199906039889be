//! Local filesystem backend.

use std::collections::VecDeque;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::config::ConfigMap;
use crate::{
    Accessor, AccessorInfo, Capabilities, Capability, Entry, EntryMode, Error, Lister, Metadata,
    OpList, OpRead, OpWrite, Operation, Pager, Result, Scheme, is_dir_path,
};

const CAPABILITIES: Capabilities = Capabilities::empty()
    .with(Capability::Read)
    .with(Capability::ReadWithRange)
    .with(Capability::Write)
    .with(Capability::WriteIdempotent)
    .with(Capability::CreateDir)
    .with(Capability::Delete)
    .with(Capability::Stat)
    .with(Capability::List)
    .with(Capability::ListRecursive)
    .with(Capability::Copy)
    .with(Capability::Rename);

/// Backend rooted at a local directory, driven through `tokio::fs`.
///
/// Content types and user metadata are not stored. Missing parent
/// directories are created on write, copy and rename.
#[derive(Debug, Clone)]
pub struct FsAccessor {
    root: PathBuf,
}

impl FsAccessor {
    /// Create an accessor rooted at `root`, which must be absolute. The
    /// directory does not need to exist yet.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_absolute() {
            return Err(Error::invalid(format!(
                "fs root must be absolute: {}",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Build from configuration keys. Recognized: `root` (required).
    pub(crate) fn from_config(config: &mut ConfigMap) -> Result<Self> {
        let root = config.require("root")?;
        Self::new(root)
    }

    fn abs(&self, path: &str) -> PathBuf {
        match path.trim_end_matches('/') {
            "" => self.root.clone(),
            rel => self.root.join(rel),
        }
    }

    /// Source must be an existing file and the target must not be a
    /// directory. Runs before any parent of the target is created.
    async fn check_transfer(&self, from: &str, to: &str, operation: Operation) -> Result<()> {
        let source = tokio::fs::metadata(self.abs(from))
            .await
            .map_err(|err| Error::from_io(operation, from, err))?;
        if source.is_dir() {
            return Err(Error::IsADirectory {
                path: from.to_string(),
                operation,
            });
        }
        match tokio::fs::metadata(self.abs(to)).await {
            Ok(target) if target.is_dir() => Err(Error::IsADirectory {
                path: to.to_string(),
                operation,
            }),
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            // A file where a parent directory should be.
            Err(err) if err.kind() == std::io::ErrorKind::NotADirectory => Ok(()),
            Err(err) => Err(Error::from_io(operation, to, err)),
        }
    }

    async fn ensure_parent(&self, path: &str, operation: Operation) -> Result<()> {
        let Some(parent) = self.abs(path).parent().map(Path::to_path_buf) else {
            return Ok(());
        };
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|err| match err.kind() {
                // A file sits where a parent directory should be.
                std::io::ErrorKind::AlreadyExists => Error::NotADirectory {
                    path: path.to_string(),
                    operation,
                },
                _ => Error::from_io(operation, path, err),
            })
    }
}

fn metadata_from_fs(meta: &std::fs::Metadata) -> Metadata {
    let mut out = if meta.is_dir() {
        Metadata::new(EntryMode::Dir)
    } else if meta.is_file() {
        Metadata::new(EntryMode::File).with_content_length(meta.len())
    } else {
        Metadata::new(EntryMode::Unknown)
    };
    if let Ok(modified) = meta.modified() {
        out = out.with_last_modified(modified);
    }
    out
}

#[async_trait]
impl Accessor for FsAccessor {
    fn info(&self) -> AccessorInfo {
        AccessorInfo::new(
            Scheme::Fs,
            self.root.to_string_lossy(),
            "",
            CAPABILITIES,
        )
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        let abs = self.abs(path);
        if let Ok(meta) = tokio::fs::metadata(&abs).await {
            if !meta.is_dir() {
                return Err(Error::NotADirectory {
                    path: path.to_string(),
                    operation: Operation::CreateDir,
                });
            }
            return Ok(());
        }
        tokio::fs::create_dir_all(&abs)
            .await
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::AlreadyExists => Error::NotADirectory {
                    path: path.to_string(),
                    operation: Operation::CreateDir,
                },
                _ => Error::from_io(Operation::CreateDir, path, err),
            })
    }

    async fn read(&self, path: &str, args: OpRead) -> Result<Vec<u8>> {
        let io = |err: std::io::Error| Error::from_io(Operation::Read, path, err);
        let mut file = tokio::fs::File::open(self.abs(path)).await.map_err(io)?;
        let mut buf = Vec::new();
        let range = args.range().unwrap_or_default();
        if range.offset() > 0 {
            file.seek(SeekFrom::Start(range.offset()))
                .await
                .map_err(io)?;
        }
        let read = match range.size() {
            Some(size) => file.take(size).read_to_end(&mut buf).await,
            None => file.read_to_end(&mut buf).await,
        };
        read.map_err(io)?;
        Ok(buf)
    }

    async fn write(&self, path: &str, data: Vec<u8>, _args: OpWrite) -> Result<()> {
        self.ensure_parent(path, Operation::Write).await?;
        tokio::fs::write(self.abs(path), data)
            .await
            .map_err(|err| Error::from_io(Operation::Write, path, err))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        if path == "/" {
            return Ok(());
        }
        let abs = self.abs(path);
        let result = if is_dir_path(path) {
            tokio::fs::remove_dir(&abs).await
        } else {
            tokio::fs::remove_file(&abs).await
        };
        match result {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => {
                Err(Error::from_io(Operation::Delete, path, err))
            }
            _ => Ok(()),
        }
    }

    async fn stat(&self, path: &str) -> Result<Metadata> {
        let meta = tokio::fs::metadata(self.abs(path))
            .await
            .map_err(|err| Error::from_io(Operation::Stat, path, err))?;
        // `a/` only names a directory and `a` only names a file.
        if meta.is_dir() != is_dir_path(path) {
            return Err(Error::NotFound {
                path: path.to_string(),
            });
        }
        Ok(metadata_from_fs(&meta))
    }

    async fn list(&self, path: &str, args: OpList) -> Result<Lister> {
        match tokio::fs::metadata(self.abs(path)).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(Error::NotADirectory {
                    path: path.to_string(),
                    operation: Operation::List,
                });
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Lister::empty()),
            Err(err) => return Err(Error::from_io(Operation::List, path, err)),
        }
        let start = if path == "/" { String::new() } else { path.to_string() };
        Ok(Lister::from_pager(FsPager {
            root: self.root.clone(),
            pending: VecDeque::from([start]),
            recursive: args.recursive(),
        }))
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        self.check_transfer(from, to, Operation::Copy).await?;
        self.ensure_parent(to, Operation::Copy).await?;
        // The source was just checked, so what fails now is the target side.
        tokio::fs::copy(self.abs(from), self.abs(to))
            .await
            .map(|_| ())
            .map_err(|err| Error::from_io(Operation::Copy, to, err))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.check_transfer(from, to, Operation::Rename).await?;
        self.ensure_parent(to, Operation::Rename).await?;
        tokio::fs::rename(self.abs(from), self.abs(to))
            .await
            .map_err(|err| Error::from_io(Operation::Rename, to, err))
    }
}

/// Reads one directory per page, breadth first when recursive.
struct FsPager {
    root: PathBuf,
    /// Relative directory prefixes still to read (`""` is the root).
    pending: VecDeque<String>,
    recursive: bool,
}

#[async_trait]
impl Pager for FsPager {
    async fn next_page(&mut self) -> Result<Option<Vec<Entry>>> {
        let Some(dir) = self.pending.pop_front() else {
            return Ok(None);
        };
        let abs = match dir.trim_end_matches('/') {
            "" => self.root.clone(),
            rel => self.root.join(rel),
        };
        let mut read_dir = match tokio::fs::read_dir(&abs).await {
            Ok(read_dir) => read_dir,
            // Removed while listing.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Some(Vec::new())),
            Err(err) => return Err(Error::from_io(Operation::List, &dir, err)),
        };

        let mut page = Vec::new();
        while let Some(child) = read_dir
            .next_entry()
            .await
            .map_err(|err| Error::from_io(Operation::List, &dir, err))?
        {
            let Ok(name) = child.file_name().into_string() else {
                tracing::warn!(dir = %dir, "skipping entry with non UTF-8 name");
                continue;
            };
            // Follows symlinks; dangling links are skipped.
            let Ok(meta) = tokio::fs::metadata(child.path()).await else {
                continue;
            };
            let metadata = metadata_from_fs(&meta);
            let path = if metadata.is_dir() {
                let path = format!("{dir}{name}/");
                if self.recursive {
                    self.pending.push_back(path.clone());
                }
                path
            } else {
                format!("{dir}{name}")
            };
            page.push(Entry::new(path, metadata));
        }
        page.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(Some(page))
    }
}
