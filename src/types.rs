//! Core types for the storage abstraction.

use std::collections::BTreeMap;
use std::time::SystemTime;

/// Kind of a storage entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntryMode {
    /// Regular object / file.
    File,
    /// Directory (or directory marker on object stores).
    Dir,
    /// The backend could not tell.
    Unknown,
}

impl EntryMode {
    /// Returns `true` for [`EntryMode::File`].
    #[inline]
    pub fn is_file(&self) -> bool {
        matches!(self, EntryMode::File)
    }

    /// Returns `true` for [`EntryMode::Dir`].
    #[inline]
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryMode::Dir)
    }

    /// Infer the mode from a normalized path's trailing slash.
    #[inline]
    pub fn from_path(path: &str) -> Self {
        if path.ends_with('/') {
            EntryMode::Dir
        } else {
            EntryMode::File
        }
    }
}

/// Normalized metadata for a storage entry.
///
/// Every field except the mode is optional: backends report what they know
/// and leave the rest unset rather than inventing sentinel values.
///
/// # Example
///
/// ```rust
/// use anystore::{EntryMode, Metadata};
///
/// let meta = Metadata::new(EntryMode::File)
///     .with_content_length(42)
///     .with_content_type("text/plain");
/// assert!(meta.is_file());
/// assert_eq!(meta.content_length(), Some(42));
/// assert_eq!(meta.etag(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metadata {
    mode: EntryMode,
    content_length: Option<u64>,
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    last_modified: Option<SystemTime>,
    etag: Option<String>,
    content_type: Option<String>,
    content_md5: Option<String>,
    user_metadata: BTreeMap<String, String>,
}

impl Metadata {
    /// Metadata with only the mode set.
    pub fn new(mode: EntryMode) -> Self {
        Self {
            mode,
            content_length: None,
            last_modified: None,
            etag: None,
            content_type: None,
            content_md5: None,
            user_metadata: BTreeMap::new(),
        }
    }

    /// Normalize raw, header-style metadata (as returned by HTTP object
    /// stores) into a [`Metadata`].
    ///
    /// Keys are matched case-insensitively. Recognized keys are
    /// `content-length`, `last-modified` (RFC 2822), `etag`, `content-type`,
    /// `content-md5`, and `x-meta-<name>` for user metadata. Unparseable
    /// values are dropped; this never fails.
    ///
    /// ```rust
    /// use anystore::{EntryMode, Metadata};
    ///
    /// let raw = [
    ///     ("Content-Length", "12"),
    ///     ("ETag", "\"abc\""),
    ///     ("Last-Modified", "not a date"),
    ///     ("x-meta-owner", "ops"),
    /// ];
    /// let meta = Metadata::from_headers(EntryMode::File, raw);
    /// assert_eq!(meta.content_length(), Some(12));
    /// assert_eq!(meta.etag(), Some("\"abc\""));
    /// assert_eq!(meta.last_modified(), None);
    /// assert_eq!(meta.user_metadata().get("owner").map(String::as_str), Some("ops"));
    /// ```
    pub fn from_headers<I, K, V>(mode: EntryMode, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut meta = Metadata::new(mode);
        for (key, value) in headers {
            let key = key.as_ref().trim().to_ascii_lowercase();
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "content-length" => meta.content_length = value.parse().ok(),
                "last-modified" => {
                    meta.last_modified = chrono::DateTime::parse_from_rfc2822(value)
                        .ok()
                        .map(SystemTime::from)
                }
                "etag" => meta.etag = Some(value.to_string()),
                "content-type" => meta.content_type = Some(value.to_string()),
                "content-md5" => meta.content_md5 = Some(value.to_string()),
                k => {
                    if let Some(name) = k.strip_prefix("x-meta-") {
                        if !name.is_empty() {
                            meta.user_metadata
                                .insert(name.to_string(), value.to_string());
                        }
                    }
                }
            }
        }
        meta
    }

    /// Entry kind.
    #[inline]
    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    /// Returns `true` if this is an object / file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.mode.is_file()
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    /// Size in bytes, if known.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Last modification time, if known.
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// Entity tag, if the backend provides one.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// MIME type, if stored.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Hex-encoded MD5 of the content, if known.
    pub fn content_md5(&self) -> Option<&str> {
        self.content_md5.as_deref()
    }

    /// Custom key/value tags.
    pub fn user_metadata(&self) -> &BTreeMap<String, String> {
        &self.user_metadata
    }

    /// Set the size.
    pub fn with_content_length(mut self, len: u64) -> Self {
        self.content_length = Some(len);
        self
    }

    /// Set the modification time.
    pub fn with_last_modified(mut self, time: SystemTime) -> Self {
        self.last_modified = Some(time);
        self
    }

    /// Set the entity tag.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Set the MIME type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the content hash.
    pub fn with_content_md5(mut self, md5: impl Into<String>) -> Self {
        self.content_md5 = Some(md5.into());
        self
    }

    /// Replace the user metadata.
    pub fn with_user_metadata(mut self, user_metadata: BTreeMap<String, String>) -> Self {
        self.user_metadata = user_metadata;
        self
    }
}

/// A listed entry: a normalized path plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entry {
    path: String,
    metadata: Metadata,
}

impl Entry {
    /// Build an entry.
    pub fn new(path: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            path: path.into(),
            metadata,
        }
    }

    /// Full normalized path, relative to the backend root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment (keeps a directory's trailing `/`).
    pub fn name(&self) -> &str {
        crate::get_basename(&self.path)
    }

    /// Entry metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Split into path and metadata.
    pub fn into_parts(self) -> (String, Metadata) {
        (self.path, self.metadata)
    }
}

/// A byte range within an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BytesRange {
    offset: u64,
    size: Option<u64>,
}

impl BytesRange {
    /// `size` bytes starting at `offset`; `None` reads to the end.
    pub fn new(offset: u64, size: Option<u64>) -> Self {
        Self { offset, size }
    }

    /// Start offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Length, or `None` for "until the end".
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Returns `true` if this range covers a whole object.
    pub fn is_full(&self) -> bool {
        self.offset == 0 && self.size.is_none()
    }

    /// Slice `data` according to this range, clamping at the end.
    pub fn apply<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        let len = data.len() as u64;
        let start = self.offset.min(len);
        let end = match self.size {
            Some(size) => start.saturating_add(size).min(len),
            None => len,
        };
        &data[start as usize..end as usize]
    }
}

impl From<std::ops::Range<u64>> for BytesRange {
    fn from(range: std::ops::Range<u64>) -> Self {
        Self::new(range.start, Some(range.end.saturating_sub(range.start)))
    }
}

impl From<std::ops::RangeFrom<u64>> for BytesRange {
    fn from(range: std::ops::RangeFrom<u64>) -> Self {
        Self::new(range.start, None)
    }
}

/// Arguments for `read`.
#[derive(Debug, Clone, Default)]
pub struct OpRead {
    range: Option<BytesRange>,
}

impl OpRead {
    /// Read the whole object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the read to `range`.
    pub fn with_range(mut self, range: BytesRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Requested range, if any.
    pub fn range(&self) -> Option<BytesRange> {
        self.range
    }
}

/// Arguments for `write`.
#[derive(Debug, Clone, Default)]
pub struct OpWrite {
    content_type: Option<String>,
    user_metadata: BTreeMap<String, String>,
}

impl OpWrite {
    /// Plain write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a MIME type with the object.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Attach a user metadata tag.
    pub fn with_user_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_metadata.insert(key.into(), value.into());
        self
    }

    /// Requested MIME type.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Requested user metadata.
    pub fn user_metadata(&self) -> &BTreeMap<String, String> {
        &self.user_metadata
    }
}

/// Arguments for `list`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpList {
    recursive: bool,
}

impl OpList {
    /// List direct children only.
    pub fn new() -> Self {
        Self::default()
    }

    /// List every descendant instead of direct children.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Whether the listing is recursive.
    pub fn recursive(&self) -> bool {
        self.recursive
    }
}

/// Serde support for optional SystemTime (when serde feature is enabled).
#[cfg(feature = "serde")]
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        time.map(|t| {
            let duration = t.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
            (duration.as_secs(), duration.subsec_nanos())
        })
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<(u64, u32)> = Deserialize::deserialize(deserializer)?;
        Ok(raw.map(|(secs, nanos)| UNIX_EPOCH + Duration::new(secs, nanos)))
    }
}
