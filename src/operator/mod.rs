//! # Operator
//!
//! The caller-facing façade over an accessor chain.
//!
//! ## Overview
//!
//! Every call goes through the same steps:
//!
//! 1. normalize the path ([`normalize_path`])
//! 2. validate it for the operation (directory vs object)
//! 3. consult the cached [`AccessorInfo`] capabilities
//! 4. forward to the chain natively, emulate from other primitives, or
//!    fail with [`Error::Unsupported`]
//!
//! | Operation | Emulated with |
//! |-----------|---------------|
//! | `create_dir` | `write(path, [])` |
//! | `copy` | `read` + `write` |
//! | `rename` | `copy` + `delete` |
//! | recursive listing | breadth-first walk of direct listings |
//! | `remove_all` | recursive listing + `delete` per entry (always) |
//!
//! Emulations made of several mutating steps are not atomic. They report
//! failures as [`Error::Partial`] carrying how many steps committed.

mod blocking;
mod builder;
mod saga;

pub use blocking::BlockingOperator;
pub use builder::OperatorBuilder;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::TryStreamExt;

use crate::{
    Accessor, AccessorInfo, BytesRange, Capabilities, Capability, DynAccessor, Entry, Error,
    Layer, Lister, Metadata, OpList, OpRead, OpWrite, Operation, Pager, RemoveAllMode, Result,
    Scheme, is_dir_path, normalize_path,
};
use saga::Saga;

/// Unified entry point for storage operations.
///
/// Cloning is cheap: clones share the accessor chain and the cached info.
///
/// # Example
///
/// ```rust
/// use anystore::{MemoryAccessor, Operator};
///
/// # tokio_test::block_on(async {
/// let op = Operator::new(MemoryAccessor::default());
/// op.write("docs/readme.md", b"# hi".to_vec()).await.unwrap();
///
/// assert!(op.is_exist("docs/readme.md").await.unwrap());
/// assert_eq!(op.read("/docs//readme.md").await.unwrap(), b"# hi");
///
/// op.remove_all("docs/").await.unwrap();
/// assert!(!op.is_exist("docs/readme.md").await.unwrap());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Operator {
    accessor: DynAccessor,
    info: Arc<AccessorInfo>,
    remove_all_mode: RemoveAllMode,
}

impl Operator {
    /// Wrap an accessor with default options.
    pub fn new<A: Accessor>(accessor: A) -> Self {
        Self::from_dyn(Arc::new(accessor))
    }

    pub(crate) fn from_dyn(accessor: DynAccessor) -> Self {
        let info = Arc::new(accessor.info());
        Self {
            accessor,
            info,
            remove_all_mode: RemoveAllMode::default(),
        }
    }

    /// Build an operator for `scheme` from a flat configuration map.
    ///
    /// See [`config`](crate::ConfigMap) for the recognized keys. Unknown
    /// keys and malformed values fail with [`Error::Invalid`].
    ///
    /// ```rust
    /// use std::collections::HashMap;
    /// use anystore::{Operator, Scheme};
    ///
    /// let map = HashMap::from([("max_retries".to_string(), "2".to_string())]);
    /// let op = Operator::via_map(Scheme::Memory, map).unwrap();
    /// assert_eq!(op.info().scheme(), Scheme::Memory);
    ///
    /// let bad = HashMap::from([("colour".to_string(), "blue".to_string())]);
    /// assert!(Operator::via_map(Scheme::Memory, bad).is_err());
    /// ```
    pub fn via_map(scheme: Scheme, map: HashMap<String, String>) -> Result<Self> {
        OperatorBuilder::from_config(scheme, crate::ConfigMap::new(map)).map(OperatorBuilder::finish)
    }

    /// [`via_map`](Self::via_map) over any iterator of key/value pairs.
    pub fn via_iter<I, K, V>(scheme: Scheme, iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        OperatorBuilder::from_config(scheme, iter.into_iter().collect()).map(OperatorBuilder::finish)
    }

    /// Wrap the current chain in `layer`. The new layer is outermost.
    pub fn layer<L>(self, layer: L) -> Self
    where
        L: Layer<DynAccessor>,
        L::LayeredAccessor: Accessor,
    {
        let remove_all_mode = self.remove_all_mode;
        let mut op = Self::from_dyn(Arc::new(layer.layer(self.accessor)));
        op.remove_all_mode = remove_all_mode;
        op
    }

    /// Set how [`remove_all`](Self::remove_all) treats failed deletes.
    pub fn with_remove_all_mode(mut self, mode: RemoveAllMode) -> Self {
        self.remove_all_mode = mode;
        self
    }

    /// Static description of the chain, read once at construction.
    pub fn info(&self) -> &AccessorInfo {
        &self.info
    }

    fn capabilities(&self) -> Capabilities {
        self.info.capabilities()
    }

    fn has(&self, cap: Capability) -> bool {
        self.capabilities().contains(cap)
    }

    fn require(&self, cap: Capability, operation: Operation) -> Result<()> {
        if self.has(cap) {
            Ok(())
        } else {
            Err(Error::unsupported(operation, self.info.scheme()))
        }
    }

    fn require_detail(
        &self,
        cap: Capability,
        operation: Operation,
        detail: &'static str,
    ) -> Result<()> {
        if self.has(cap) {
            Ok(())
        } else {
            Err(Error::Unsupported {
                operation,
                scheme: self.info.scheme(),
                detail: Some(detail),
            })
        }
    }

    fn can_copy(&self) -> bool {
        self.has(Capability::Copy) || (self.has(Capability::Read) && self.has(Capability::Write))
    }

    /// Read a whole object.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.read_with_range(path, BytesRange::default()).await
    }

    /// Read `range` of an object. Requires native ranged reads unless the
    /// range covers the whole object.
    pub async fn read_with_range(
        &self,
        path: &str,
        range: impl Into<BytesRange>,
    ) -> Result<Vec<u8>> {
        let path = object_path(path, Operation::Read)?;
        self.require(Capability::Read, Operation::Read)?;
        let range = range.into();
        let args = if range.is_full() {
            OpRead::new()
        } else {
            self.require_detail(Capability::ReadWithRange, Operation::Read, "range reads")?;
            OpRead::new().with_range(range)
        };
        self.accessor.read(&path, args).await
    }

    /// Write an object, replacing previous content.
    pub async fn write(&self, path: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        self.write_with(path, data, OpWrite::new()).await
    }

    /// Write with a content type and/or user metadata. Each option needs the
    /// matching capability; nothing is silently dropped.
    pub async fn write_with(
        &self,
        path: &str,
        data: impl Into<Vec<u8>>,
        args: OpWrite,
    ) -> Result<()> {
        let path = object_path(path, Operation::Write)?;
        self.require(Capability::Write, Operation::Write)?;
        if args.content_type().is_some() {
            self.require_detail(
                Capability::WriteWithContentType,
                Operation::Write,
                "content type",
            )?;
        }
        if !args.user_metadata().is_empty() {
            self.require_detail(
                Capability::WriteWithUserMetadata,
                Operation::Write,
                "user metadata",
            )?;
        }
        self.accessor.write(&path, data.into(), args).await
    }

    /// Delete a path. Deleting something that does not exist succeeds.
    /// The root itself is never deleted; `delete("/")` is a no-op.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let path = normalize_path(path);
        self.require(Capability::Delete, Operation::Delete)?;
        if path == "/" {
            return Ok(());
        }
        self.accessor.delete(&path).await
    }

    /// Fetch metadata.
    pub async fn stat(&self, path: &str) -> Result<Metadata> {
        let path = normalize_path(path);
        self.require(Capability::Stat, Operation::Stat)?;
        self.accessor.stat(&path).await
    }

    /// `true` if `stat` succeeds, `false` if it reports `NotFound`. Other
    /// errors propagate.
    pub async fn is_exist(&self, path: &str) -> Result<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Create a directory (path must end with `/`). Creating an existing
    /// directory succeeds.
    pub async fn create_dir(&self, path: &str) -> Result<()> {
        let path = normalize_path(path);
        if !is_dir_path(&path) {
            return Err(Error::NotADirectory {
                path,
                operation: Operation::CreateDir,
            });
        }
        if self.has(Capability::CreateDir) {
            return self.accessor.create_dir(&path).await;
        }
        if self.has(Capability::Write) {
            // Object stores model directories as empty marker objects.
            return self.accessor.write(&path, Vec::new(), OpWrite::new()).await;
        }
        Err(Error::unsupported(Operation::CreateDir, self.info.scheme()))
    }

    /// Direct children of a directory, fully collected.
    pub async fn list(&self, path: &str) -> Result<Vec<Entry>> {
        self.list_with(path, OpList::new()).await
    }

    /// Collected listing with options (e.g. recursive).
    pub async fn list_with(&self, path: &str, args: OpList) -> Result<Vec<Entry>> {
        self.lister_with(path, args).await?.collect_all().await
    }

    /// Lazy listing of direct children.
    pub async fn lister(&self, path: &str) -> Result<Lister> {
        self.lister_with(path, OpList::new()).await
    }

    /// Lazy listing with options. Recursive listings are emulated by a
    /// breadth-first walk when the backend lacks
    /// [`Capability::ListRecursive`].
    pub async fn lister_with(&self, path: &str, args: OpList) -> Result<Lister> {
        let path = normalize_path(path);
        if !is_dir_path(&path) {
            return Err(Error::NotADirectory {
                path,
                operation: Operation::List,
            });
        }
        self.require(Capability::List, Operation::List)?;
        if !args.recursive() || self.has(Capability::ListRecursive) {
            return self.accessor.list(&path, args).await;
        }
        // Fail on the listed directory itself before handing out a lister.
        let first = self.accessor.list(&path, OpList::new()).await?;
        Ok(Lister::from_pager(WalkPager {
            accessor: self.accessor.clone(),
            current: Some(first),
            pending: VecDeque::new(),
        }))
    }

    /// Copy an object. Emulated as read + write without native support.
    pub async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let from = object_path(from, Operation::Copy)?;
        let to = object_path(to, Operation::Copy)?;
        self.copy_normalized(&from, &to).await
    }

    async fn copy_normalized(&self, from: &str, to: &str) -> Result<()> {
        if self.has(Capability::Copy) {
            return self.accessor.copy(from, to).await;
        }
        if !self.can_copy() {
            return Err(Error::unsupported(Operation::Copy, self.info.scheme()));
        }
        let mut saga = Saga::new(Operation::Copy);
        let data = saga
            .step(
                format!("read {from}"),
                self.accessor.read(from, OpRead::new()),
            )
            .await?;
        saga.step(
            format!("write {to}"),
            self.accessor.write(to, data, OpWrite::new()),
        )
        .await
    }

    /// Rename an object. Emulated as copy + delete without native support.
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from = object_path(from, Operation::Rename)?;
        let to = object_path(to, Operation::Rename)?;
        if self.has(Capability::Rename) {
            return self.accessor.rename(&from, &to).await;
        }
        if !self.can_copy() || !self.has(Capability::Delete) {
            return Err(Error::unsupported(Operation::Rename, self.info.scheme()));
        }
        if from == to {
            // Copy then delete would destroy the only copy.
            return Err(Error::invalid(format!(
                "rename source and target are the same path: {from}"
            )));
        }
        let mut saga = Saga::new(Operation::Rename);
        saga.step(format!("copy {from} {to}"), self.copy_normalized(&from, &to))
            .await?;
        saga.step(format!("delete {from}"), self.accessor.delete(&from))
            .await
    }

    /// Remove a path and everything below it.
    ///
    /// A path without a trailing `/` names a single object, which is
    /// deleted on its own. For a directory every descendant is deleted
    /// deepest first, then the directory itself (never the root). Failed
    /// deletes are handled per [`RemoveAllMode`].
    pub async fn remove_all(&self, path: &str) -> Result<()> {
        let path = normalize_path(path);
        self.require(Capability::Delete, Operation::RemoveAll)?;
        if !is_dir_path(&path) {
            return self.accessor.delete(&path).await;
        }

        let mut targets: Vec<String> = self
            .lister_with(&path, OpList::new().with_recursive(true))
            .await?
            .map_ok(|entry| entry.into_parts().0)
            .try_collect()
            .await?;
        // Descendants sort after their ancestors; reversed, children go first.
        targets.sort_unstable_by(|a, b| b.cmp(a));
        targets.dedup();
        if path != "/" {
            targets.push(path.clone());
        }

        match self.remove_all_mode {
            RemoveAllMode::FailFast => {
                let mut saga = Saga::new(Operation::RemoveAll);
                for target in &targets {
                    saga.step(format!("delete {target}"), self.accessor.delete(target))
                        .await?;
                }
                tracing::debug!(path = %path, deleted = saga.committed().len(), "remove_all finished");
                Ok(())
            }
            RemoveAllMode::IgnoreMissing => {
                let mut failed = 0usize;
                for target in &targets {
                    if let Err(err) = self.accessor.delete(target).await {
                        failed += 1;
                        tracing::warn!(
                            path = %target,
                            kind = %err.kind(),
                            error = %err,
                            "remove_all: delete failed, continuing"
                        );
                    }
                }
                tracing::debug!(
                    path = %path,
                    attempted = targets.len(),
                    failed,
                    "remove_all finished"
                );
                Ok(())
            }
        }
    }
}

/// Normalize a path that must name an object rather than a directory.
fn object_path(path: &str, operation: Operation) -> Result<String> {
    let path = normalize_path(path);
    if is_dir_path(&path) {
        return Err(Error::IsADirectory { path, operation });
    }
    Ok(path)
}

/// Breadth-first recursive listing built from direct listings.
///
/// Each page is one directory; subdirectories are queued as they are seen.
struct WalkPager {
    accessor: DynAccessor,
    current: Option<Lister>,
    pending: VecDeque<String>,
}

#[async_trait]
impl Pager for WalkPager {
    async fn next_page(&mut self) -> Result<Option<Vec<Entry>>> {
        let lister = match self.current.take() {
            Some(lister) => lister,
            None => match self.pending.pop_front() {
                Some(dir) => self.accessor.list(&dir, OpList::new()).await?,
                None => return Ok(None),
            },
        };
        let page = lister.collect_all().await?;
        for entry in &page {
            if entry.metadata().is_dir() {
                self.pending.push_back(entry.path().to_string());
            }
        }
        Ok(Some(page))
    }
}
