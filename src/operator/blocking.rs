//! Synchronous façade over [`Operator`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::{
    AccessorInfo, BytesRange, Entry, Error, Metadata, OpList, OpWrite, Operator, Result, Scheme,
};

/// Blocking counterpart of [`Operator`].
///
/// Each call drives the async operation to completion on a private
/// current-thread Tokio runtime. The same core logic runs in both modes;
/// nothing is reimplemented here.
///
/// Calling a blocking method from inside a Tokio runtime would stall that
/// runtime's worker, so it fails with [`Error::Invalid`] instead.
///
/// ```rust
/// use anystore::{BlockingOperator, Scheme};
/// use std::collections::HashMap;
///
/// let op = BlockingOperator::via_map(Scheme::Memory, HashMap::new()).unwrap();
/// op.write("hello.txt", "hi").unwrap();
/// assert_eq!(op.read("hello.txt").unwrap(), b"hi");
/// assert!(op.is_exist("hello.txt").unwrap());
/// assert_eq!(op.list("/").unwrap().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct BlockingOperator {
    op: Operator,
    runtime: Arc<Runtime>,
}

impl BlockingOperator {
    /// Wrap an async operator, creating the runtime that will drive it.
    pub fn new(op: Operator) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .thread_name("anystore-blocking")
            .build()
            .map_err(|err| Error::Internal(format!("failed to build runtime: {err}")))?;
        Ok(Self {
            op,
            runtime: Arc::new(runtime),
        })
    }

    /// Build from a scheme and a flat configuration map, like
    /// [`Operator::via_map`].
    pub fn via_map(scheme: Scheme, map: HashMap<String, String>) -> Result<Self> {
        Self::new(Operator::via_map(scheme, map)?)
    }

    /// A second handle sharing the accessor chain and the runtime.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Static description of the chain.
    pub fn info(&self) -> &AccessorInfo {
        self.op.info()
    }

    /// The async operator being driven.
    pub fn operator(&self) -> &Operator {
        &self.op
    }

    fn block_on<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        if Handle::try_current().is_ok() {
            return Err(Error::invalid(
                "blocking operator called from inside an async runtime; use Operator instead",
            ));
        }
        self.runtime.block_on(fut)
    }

    /// Blocking [`Operator::write`].
    pub fn write(&self, path: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        self.block_on(self.op.write(path, data))
    }

    /// Blocking [`Operator::write_with`].
    pub fn write_with(&self, path: &str, data: impl Into<Vec<u8>>, args: OpWrite) -> Result<()> {
        self.block_on(self.op.write_with(path, data, args))
    }

    /// Blocking [`Operator::read`].
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.block_on(self.op.read(path))
    }

    /// Blocking [`Operator::read_with_range`].
    pub fn read_with_range(&self, path: &str, range: impl Into<BytesRange>) -> Result<Vec<u8>> {
        self.block_on(self.op.read_with_range(path, range))
    }

    /// Blocking [`Operator::delete`].
    pub fn delete(&self, path: &str) -> Result<()> {
        self.block_on(self.op.delete(path))
    }

    /// Blocking [`Operator::stat`].
    pub fn stat(&self, path: &str) -> Result<Metadata> {
        self.block_on(self.op.stat(path))
    }

    /// Blocking [`Operator::is_exist`].
    pub fn is_exist(&self, path: &str) -> Result<bool> {
        self.block_on(self.op.is_exist(path))
    }

    /// Blocking [`Operator::create_dir`].
    pub fn create_dir(&self, path: &str) -> Result<()> {
        self.block_on(self.op.create_dir(path))
    }

    /// Blocking [`Operator::copy`].
    pub fn copy(&self, from: &str, to: &str) -> Result<()> {
        self.block_on(self.op.copy(from, to))
    }

    /// Blocking [`Operator::rename`].
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.block_on(self.op.rename(from, to))
    }

    /// Blocking [`Operator::remove_all`].
    pub fn remove_all(&self, path: &str) -> Result<()> {
        self.block_on(self.op.remove_all(path))
    }

    /// Blocking [`Operator::list`]; entries are collected eagerly.
    pub fn list(&self, path: &str) -> Result<Vec<Entry>> {
        self.block_on(self.op.list(path))
    }

    /// Blocking [`Operator::list_with`].
    pub fn list_with(&self, path: &str, args: OpList) -> Result<Vec<Entry>> {
        self.block_on(self.op.list_with(path, args))
    }
}

impl From<BlockingOperator> for Operator {
    fn from(op: BlockingOperator) -> Self {
        op.op
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, MemoryAccessor};

    fn memory() -> BlockingOperator {
        BlockingOperator::new(Operator::new(MemoryAccessor::default())).unwrap()
    }

    #[test]
    fn round_trip() {
        let op = memory();
        op.write("dir/a.txt", b"hello world".to_vec()).unwrap();
        assert_eq!(op.read("dir/a.txt").unwrap(), b"hello world");
        assert_eq!(op.read_with_range("dir/a.txt", 6u64..).unwrap(), b"world");
        assert_eq!(op.stat("dir/a.txt").unwrap().content_length(), Some(11));

        op.copy("dir/a.txt", "dir/b.txt").unwrap();
        op.rename("dir/b.txt", "c.txt").unwrap();
        let mut names: Vec<String> = op
            .list_with("/", OpList::new().with_recursive(true))
            .unwrap()
            .into_iter()
            .map(|e| e.path().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["c.txt", "dir/", "dir/a.txt"]);

        op.remove_all("dir/").unwrap();
        assert!(!op.is_exist("dir/a.txt").unwrap());
        op.delete("c.txt").unwrap();
        assert!(op.list("/").unwrap().is_empty());
    }

    #[test]
    fn duplicate_shares_state() {
        let op = memory();
        let dup = op.duplicate();
        op.create_dir("shared/").unwrap();
        assert!(dup.stat("shared/").unwrap().is_dir());
        assert_eq!(dup.info(), op.info());
    }

    #[test]
    fn clones_work_from_other_threads() {
        let op = memory();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let op = op.duplicate();
                std::thread::spawn(move || op.write(&format!("t{i}"), vec![i as u8]))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(op.list("/").unwrap().len(), 4);
    }

    #[test]
    fn rejects_calls_inside_a_runtime() {
        let op = memory();
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let err = rt.block_on(async { op.stat("x").unwrap_err() });
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }
}
