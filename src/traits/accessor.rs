//! The backend accessor trait.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{AccessorInfo, Error, Lister, Metadata, OpList, OpRead, OpWrite, Operation, Result};

/// Physical storage operations for one backend.
///
/// Paths handed to an accessor are already normalized (see
/// [`normalize_path`](crate::normalize_path)) and relative to the accessor's
/// root; directories end with `/`.
///
/// Every operation has a default body that fails with
/// [`Error::Unsupported`], so a backend only implements what its
/// [`AccessorInfo`] declares. Declaring a capability that is not
/// implemented is a bug in the backend.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. Methods take `&self`; backends use
/// interior mutability and manage their own connection pools.
///
/// # Object Safety
///
/// This trait is object-safe. The [`Operator`](crate::Operator) stores the
/// chain as `Arc<dyn Accessor>`.
#[async_trait]
pub trait Accessor: Send + Sync + Debug + 'static {
    /// Static description, including the capability set.
    fn info(&self) -> AccessorInfo;

    /// Create a directory. Idempotent.
    ///
    /// # Errors
    ///
    /// - [`Error::NotADirectory`] if a file occupies the path
    async fn create_dir(&self, path: &str) -> Result<()> {
        let _ = path;
        Err(Error::unsupported(Operation::CreateDir, self.info().scheme()))
    }

    /// Read an object, honouring `args.range()` exactly.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the object does not exist
    /// - [`Error::IsADirectory`] if the path is a directory
    async fn read(&self, path: &str, args: OpRead) -> Result<Vec<u8>> {
        let _ = (path, args);
        Err(Error::unsupported(Operation::Read, self.info().scheme()))
    }

    /// Write an object, replacing any previous content.
    ///
    /// # Errors
    ///
    /// - [`Error::IsADirectory`] if the path is a directory
    /// - [`Error::PermissionDenied`] if the backend refuses the write
    async fn write(&self, path: &str, data: Vec<u8>, args: OpWrite) -> Result<()> {
        let _ = (path, data, args);
        Err(Error::unsupported(Operation::Write, self.info().scheme()))
    }

    /// Delete a path. Deleting a missing path succeeds.
    async fn delete(&self, path: &str) -> Result<()> {
        let _ = path;
        Err(Error::unsupported(Operation::Delete, self.info().scheme()))
    }

    /// Fetch metadata.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the path does not exist
    async fn stat(&self, path: &str) -> Result<Metadata> {
        let _ = path;
        Err(Error::unsupported(Operation::Stat, self.info().scheme()))
    }

    /// List a directory. The directory itself is not part of the listing.
    ///
    /// # Errors
    ///
    /// - [`Error::NotADirectory`] if the path names a file
    async fn list(&self, path: &str, args: OpList) -> Result<Lister> {
        let _ = (path, args);
        Err(Error::unsupported(Operation::List, self.info().scheme()))
    }

    /// Server-side copy.
    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let _ = (from, to);
        Err(Error::unsupported(Operation::Copy, self.info().scheme()))
    }

    /// Server-side rename.
    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let _ = (from, to);
        Err(Error::unsupported(Operation::Rename, self.info().scheme()))
    }
}

/// Type-erased accessor chain.
pub type DynAccessor = Arc<dyn Accessor>;

// Shared handles forward everything, so erased chains can be layered again.
#[async_trait]
impl<T: Accessor + ?Sized> Accessor for Arc<T> {
    fn info(&self) -> AccessorInfo {
        self.as_ref().info()
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        self.as_ref().create_dir(path).await
    }

    async fn read(&self, path: &str, args: OpRead) -> Result<Vec<u8>> {
        self.as_ref().read(path, args).await
    }

    async fn write(&self, path: &str, data: Vec<u8>, args: OpWrite) -> Result<()> {
        self.as_ref().write(path, data, args).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.as_ref().delete(path).await
    }

    async fn stat(&self, path: &str) -> Result<Metadata> {
        self.as_ref().stat(path).await
    }

    async fn list(&self, path: &str, args: OpList) -> Result<Lister> {
        self.as_ref().list(path, args).await
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        self.as_ref().copy(from, to).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.as_ref().rename(from, to).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Capabilities, Capability, ErrorKind, Scheme};

    #[derive(Debug)]
    struct StatOnly;

    #[async_trait]
    impl Accessor for StatOnly {
        fn info(&self) -> AccessorInfo {
            AccessorInfo::new(
                Scheme::Custom("stat-only"),
                "/",
                "test",
                Capabilities::empty().with(Capability::Stat),
            )
        }

        async fn stat(&self, path: &str) -> Result<Metadata> {
            Ok(Metadata::new(crate::EntryMode::from_path(path)))
        }
    }

    #[test]
    fn accessor_is_object_safe() {
        fn _check(_: &dyn Accessor) {}
    }

    #[test]
    fn accessor_requires_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        fn _check<T: Accessor>() {
            _assert_send_sync::<T>();
        }
    }

    #[tokio::test]
    async fn undeclared_operations_are_unsupported() {
        let acc = StatOnly;
        let err = acc.read("a", OpRead::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert!(err.to_string().contains("stat-only"));
        assert!(acc.stat("a/").await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn arc_dyn_forwards() {
        let acc: DynAccessor = Arc::new(StatOnly);
        assert_eq!(acc.info().scheme(), Scheme::Custom("stat-only"));
        assert!(acc.stat("a").await.unwrap().is_file());
        let err = acc.delete("a").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}
