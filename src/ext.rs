//! # Extension Traits
//!
//! Convenience methods for accessors.
//!
//! ## Overview
//!
//! [`AccessorExt`] provides commonly-needed queries that aren't part of
//! the [`Accessor`] contract. They are default methods with a blanket
//! implementation, so every backend and every layered chain gets them.
//!
//! ## Available Methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`is_exist`](AccessorExt::is_exist) | Check if a path exists |
//! | [`is_file`](AccessorExt::is_file) | Check if a path is an object |
//! | [`is_dir`](AccessorExt::is_dir) | Check if a path is a directory |
//! | [`content_length`](AccessorExt::content_length) | Size of an object |
//!
//! ## JSON Support (Feature-Gated)
//!
//! With the `serde` feature enabled, `AccessorJsonExt` adds:
//!
//! | Method | Description |
//! |--------|-------------|
//! | `read_json` | Read and deserialize a JSON object |
//! | `write_json` | Serialize and write a JSON object |
//!
//! Enable with:
//! ```toml
//! [dependencies]
//! anystore = { version = "0.1", features = ["serde"] }
//! ```

use async_trait::async_trait;

use crate::{Accessor, Error, Result};

/// Extension methods for any accessor.
///
/// Paths follow the accessor convention: normalized, directories ending
/// with `/`.
///
/// # Example
///
/// ```rust
/// use anystore::{Accessor, AccessorExt, OpWrite, MemoryAccessor};
///
/// # tokio_test::block_on(async {
/// let acc = MemoryAccessor::default();
/// acc.write("config.json", b"{}".to_vec(), OpWrite::new()).await.unwrap();
///
/// assert!(acc.is_file("config.json").await.unwrap());
/// assert!(!acc.is_dir("data/").await.unwrap());
/// # });
/// ```
#[async_trait]
pub trait AccessorExt: Accessor {
    /// Returns `Ok(false)` if `stat` reports [`Error::NotFound`]. Other
    /// errors propagate.
    async fn is_exist(&self, path: &str) -> Result<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Check if the path is an object.
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    async fn is_file(&self, path: &str) -> Result<bool> {
        match self.stat(path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Check if the path is a directory.
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    async fn is_dir(&self, path: &str) -> Result<bool> {
        match self.stat(path).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Size of an object in bytes. Backends that do not report a length
    /// yield `0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the path doesn't exist.
    async fn content_length(&self, path: &str) -> Result<u64> {
        Ok(self.stat(path).await?.content_length().unwrap_or(0))
    }
}

// Blanket implementation - any accessor gets AccessorExt for free
impl<A: Accessor + ?Sized> AccessorExt for A {}

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use crate::{Capability, OpRead, OpWrite};
    use serde::{Serialize, de::DeserializeOwned};

    /// JSON serialization extension methods.
    ///
    /// Available when the `serde` feature is enabled.
    #[async_trait]
    pub trait AccessorJsonExt: Accessor {
        /// Read an object and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - [`Error::NotFound`] if the object doesn't exist
        /// - [`Error::Invalid`] if the content is not valid JSON for `T`
        async fn read_json<T>(&self, path: &str) -> Result<T>
        where
            T: DeserializeOwned + Send,
        {
            let data = self.read(path, OpRead::new()).await?;
            serde_json::from_slice(&data)
                .map_err(|err| Error::invalid(format!("{path}: malformed JSON: {err}")))
        }

        /// Serialize a value and write it as pretty-printed JSON.
        ///
        /// The object is tagged `application/json` when the backend keeps
        /// content types.
        async fn write_json<T>(&self, path: &str, value: &T) -> Result<()>
        where
            T: Serialize + Sync,
        {
            let json = serde_json::to_vec_pretty(value)
                .map_err(|err| Error::invalid(format!("{path}: cannot serialize: {err}")))?;
            let mut args = OpWrite::new();
            if self
                .info()
                .capabilities()
                .contains(Capability::WriteWithContentType)
            {
                args = args.with_content_type("application/json");
            }
            self.write(path, json, args).await
        }
    }

    impl<A: Accessor + ?Sized> AccessorJsonExt for A {}
}

#[cfg(feature = "serde")]
pub use json::AccessorJsonExt;
