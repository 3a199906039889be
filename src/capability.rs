//! # Capabilities
//!
//! Static declaration of what an accessor supports natively.
//!
//! ## Overview
//!
//! Every [`Accessor`](crate::Accessor) reports an [`AccessorInfo`] carrying a
//! [`Capabilities`] set. The [`Operator`](crate::Operator) reads it once at
//! construction and uses it to pick between the native path, an emulation
//! built from other primitives, or an `Unsupported` error.
//!
//! | Tag | Meaning when declared |
//! |-----|-----------------------|
//! | `Read` | `read` without a range |
//! | `ReadWithRange` | `read` honours byte ranges exactly |
//! | `Write` | `write` overwrites whole objects |
//! | `WriteIdempotent` | repeating a `write` with the same bytes is harmless |
//! | `WriteWithContentType` | `write` stores `OpWrite::content_type` |
//! | `WriteWithUserMetadata` | `write` stores `OpWrite::user_metadata` |
//! | `CreateDir` | native directory creation |
//! | `Delete` | `delete` |
//! | `Stat` | `stat` |
//! | `List` | non-recursive `list` |
//! | `ListRecursive` | `list` with `recursive = true` |
//! | `ListOrdered` | listings come back in lexicographic path order |
//! | `Copy` | server-side copy |
//! | `Rename` | server-side rename |

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Logical operation names, used in errors, logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    /// Read an object.
    Read,
    /// Write an object.
    Write,
    /// Delete a path.
    Delete,
    /// Fetch metadata.
    Stat,
    /// List a directory.
    List,
    /// Copy an object.
    Copy,
    /// Rename an object.
    Rename,
    /// Create a directory.
    CreateDir,
    /// Recursively remove a path.
    RemoveAll,
}

impl Operation {
    /// All operations, in declaration order.
    pub const ALL: [Operation; 9] = [
        Operation::Read,
        Operation::Write,
        Operation::Delete,
        Operation::Stat,
        Operation::List,
        Operation::Copy,
        Operation::Rename,
        Operation::CreateDir,
        Operation::RemoveAll,
    ];

    /// Stable snake_case name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Delete => "delete",
            Operation::Stat => "stat",
            Operation::List => "list",
            Operation::Copy => "copy",
            Operation::Rename => "rename",
            Operation::CreateDir => "create_dir",
            Operation::RemoveAll => "remove_all",
        }
    }

    /// Whether repeating a successful call leaves the same final state.
    ///
    /// `write` depends on the backend and is answered by
    /// [`Capability::WriteIdempotent`] instead; `rename` never is.
    pub const fn is_idempotent(&self) -> bool {
        !matches!(self, Operation::Write | Operation::Rename)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single natively supported feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Capability {
    /// Plain reads.
    Read = 0,
    /// Ranged reads.
    ReadWithRange = 1,
    /// Whole-object writes.
    Write = 2,
    /// Writes may be repeated safely.
    WriteIdempotent = 3,
    /// Writes persist a content type.
    WriteWithContentType = 4,
    /// Writes persist user metadata.
    WriteWithUserMetadata = 5,
    /// Native directory creation.
    CreateDir = 6,
    /// Deletes.
    Delete = 7,
    /// Metadata lookups.
    Stat = 8,
    /// Listing direct children.
    List = 9,
    /// Listing all descendants in one call.
    ListRecursive = 10,
    /// Listings are ordered.
    ListOrdered = 11,
    /// Server-side copy.
    Copy = 12,
    /// Server-side rename.
    Rename = 13,
}

impl Capability {
    const ALL: [Capability; 14] = [
        Capability::Read,
        Capability::ReadWithRange,
        Capability::Write,
        Capability::WriteIdempotent,
        Capability::WriteWithContentType,
        Capability::WriteWithUserMetadata,
        Capability::CreateDir,
        Capability::Delete,
        Capability::Stat,
        Capability::List,
        Capability::ListRecursive,
        Capability::ListOrdered,
        Capability::Copy,
        Capability::Rename,
    ];

    #[inline]
    const fn bit(self) -> u16 {
        1 << (self as u8)
    }
}

/// Immutable-by-convention set of [`Capability`] tags.
///
/// # Example
///
/// ```rust
/// use anystore::{Capabilities, Capability};
///
/// let caps = Capabilities::empty()
///     .with(Capability::Read)
///     .with(Capability::Write);
/// assert!(caps.contains(Capability::Read));
/// assert!(!caps.contains(Capability::Copy));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u16);

impl Capabilities {
    /// The empty set.
    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns a copy of this set with `cap` added.
    #[inline]
    pub const fn with(self, cap: Capability) -> Self {
        Self(self.0 | cap.bit())
    }

    /// Returns a copy of this set with `cap` removed.
    #[inline]
    pub const fn without(self, cap: Capability) -> Self {
        Self(self.0 & !cap.bit())
    }

    /// Add a capability in place.
    #[inline]
    pub fn insert(&mut self, cap: Capability) {
        self.0 |= cap.bit();
    }

    /// Check membership.
    #[inline]
    pub const fn contains(&self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    /// Returns `true` if no capability is declared.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate over declared capabilities in tag order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut caps = Capabilities::empty();
        for cap in iter {
            caps.insert(cap);
        }
        caps
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Identifies a backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// In-process map.
    Memory,
    /// Local filesystem.
    Fs,
    /// Backend defined outside this crate.
    Custom(&'static str),
}

impl Scheme {
    /// Stable name, as accepted by [`FromStr`].
    pub const fn as_str(&self) -> &'static str {
        match self {
            Scheme::Memory => "memory",
            Scheme::Fs => "fs",
            Scheme::Custom(name) => name,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Scheme::Memory),
            "fs" => Ok(Scheme::Fs),
            other => Err(Error::invalid(format!("unknown scheme: {other:?}"))),
        }
    }
}

/// Static description of an accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorInfo {
    scheme: Scheme,
    root: String,
    name: String,
    capabilities: Capabilities,
}

impl AccessorInfo {
    /// Create a description. `root` is the backend-side root the accessor
    /// resolves paths against; `name` is a free-form instance label.
    pub fn new(
        scheme: Scheme,
        root: impl Into<String>,
        name: impl Into<String>,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            scheme,
            root: root.into(),
            name: name.into(),
            capabilities,
        }
    }

    /// Backend kind.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Backend root.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared capabilities.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_insert_and_contains() {
        let mut caps = Capabilities::empty();
        assert!(caps.is_empty());
        caps.insert(Capability::List);
        assert!(caps.contains(Capability::List));
        assert!(!caps.contains(Capability::ListRecursive));
    }

    #[test]
    fn capabilities_without() {
        let caps = Capabilities::empty()
            .with(Capability::Copy)
            .with(Capability::Rename)
            .without(Capability::Copy);
        assert!(!caps.contains(Capability::Copy));
        assert!(caps.contains(Capability::Rename));
    }

    #[test]
    fn capabilities_iter_in_tag_order() {
        let caps: Capabilities = [Capability::Rename, Capability::Read, Capability::Stat]
            .into_iter()
            .collect();
        let listed: Vec<_> = caps.iter().collect();
        assert_eq!(
            listed,
            vec![Capability::Read, Capability::Stat, Capability::Rename]
        );
    }

    #[test]
    fn capabilities_debug_lists_tags() {
        let caps = Capabilities::empty().with(Capability::Read);
        assert_eq!(format!("{caps:?}"), "{Read}");
    }

    #[test]
    fn scheme_from_str() {
        assert_eq!("memory".parse::<Scheme>().unwrap(), Scheme::Memory);
        assert_eq!(" FS ".parse::<Scheme>().unwrap(), Scheme::Fs);
        assert!("s3".parse::<Scheme>().is_err());
    }

    #[test]
    fn operation_idempotence() {
        assert!(Operation::Delete.is_idempotent());
        assert!(Operation::Copy.is_idempotent());
        assert!(!Operation::Write.is_idempotent());
        assert!(!Operation::Rename.is_idempotent());
    }

    #[test]
    fn operation_names() {
        assert_eq!(Operation::CreateDir.to_string(), "create_dir");
        assert_eq!(Operation::ALL.len(), 9);
    }
}
