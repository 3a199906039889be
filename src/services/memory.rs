//! In-process backend over an ordered map.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use async_trait::async_trait;
use md5::{Digest, Md5};

use crate::config::ConfigMap;
use crate::{
    Accessor, AccessorInfo, Capabilities, Capability, EntryMode, Entry, Error, Lister, Metadata,
    OpList, OpRead, OpWrite, Operation, Result, Scheme, get_parent, is_dir_path, normalize_root,
};

const CAPABILITIES: Capabilities = Capabilities::empty()
    .with(Capability::Read)
    .with(Capability::ReadWithRange)
    .with(Capability::Write)
    .with(Capability::WriteIdempotent)
    .with(Capability::WriteWithContentType)
    .with(Capability::WriteWithUserMetadata)
    .with(Capability::CreateDir)
    .with(Capability::Delete)
    .with(Capability::Stat)
    .with(Capability::List)
    .with(Capability::ListRecursive)
    .with(Capability::ListOrdered)
    .with(Capability::Copy)
    .with(Capability::Rename);

#[derive(Debug, Clone)]
struct Node {
    content: Vec<u8>,
    metadata: Metadata,
}

/// Object-store style backend kept in memory.
///
/// Keys are normalized paths. Directories exist either as explicit markers
/// (from `create_dir`) or implicitly as the prefix of a stored object.
/// Listings come back in lexicographic order.
///
/// ```rust
/// use anystore::{Accessor, MemoryAccessor, OpRead, OpWrite};
///
/// # tokio_test::block_on(async {
/// let acc = MemoryAccessor::default();
/// acc.write("a/b.txt", b"hi".to_vec(), OpWrite::new()).await.unwrap();
/// assert_eq!(acc.read("a/b.txt", OpRead::new()).await.unwrap(), b"hi");
/// assert!(acc.stat("a/").await.unwrap().is_dir());
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryAccessor {
    root: String,
    capabilities: Capabilities,
    nodes: RwLock<BTreeMap<String, Node>>,
}

impl Default for MemoryAccessor {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MemoryAccessor {
    /// Create an empty store. `root` is only reported through
    /// [`AccessorInfo::root`]; each instance owns its own map.
    pub fn new(root: &str) -> Self {
        Self {
            root: normalize_root(root),
            capabilities: CAPABILITIES,
            nodes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build from configuration keys. Recognized: `root`.
    pub(crate) fn from_config(config: &mut ConfigMap) -> Result<Self> {
        let root = config.take("root");
        Ok(Self::new(root.as_deref().unwrap_or("/")))
    }

    /// Stop declaring `capability`, so the operator falls back to its
    /// emulation (or reports `Unsupported`).
    pub fn without(mut self, capability: Capability) -> Self {
        self.capabilities = self.capabilities.without(capability);
        self
    }
}

fn poisoned<T>(_: PoisonError<T>) -> Error {
    Error::Internal("memory store lock poisoned".to_string())
}

fn hex_md5(data: &[u8]) -> String {
    Md5::digest(data).iter().map(|b| format!("{b:02x}")).collect()
}

/// Directory prefix under which children of `dir` are stored.
fn child_prefix(dir: &str) -> &str {
    if dir == "/" { "" } else { dir }
}

fn dir_exists(nodes: &BTreeMap<String, Node>, dir: &str) -> bool {
    let prefix = child_prefix(dir);
    prefix.is_empty()
        || nodes
            .range(prefix.to_string()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(prefix))
}

/// Every ancestor of `path` that is stored as an object blocks the write.
fn check_ancestors(nodes: &BTreeMap<String, Node>, path: &str, operation: Operation) -> Result<()> {
    let mut parent = get_parent(path);
    while parent != "/" {
        let as_file = parent.trim_end_matches('/');
        if nodes.contains_key(as_file) {
            return Err(Error::NotADirectory {
                path: as_file.to_string(),
                operation,
            });
        }
        parent = get_parent(parent);
    }
    Ok(())
}

/// An object may not land on a path that already names a directory, nor
/// below an object.
fn check_target(nodes: &BTreeMap<String, Node>, path: &str, operation: Operation) -> Result<()> {
    if !is_dir_path(path) && dir_exists(nodes, &format!("{path}/")) {
        return Err(Error::IsADirectory {
            path: path.to_string(),
            operation,
        });
    }
    check_ancestors(nodes, path, operation)
}

fn dir_entry(path: String, nodes: &BTreeMap<String, Node>) -> Entry {
    let metadata = nodes
        .get(&path)
        .map(|node| node.metadata.clone())
        .unwrap_or_else(|| Metadata::new(EntryMode::Dir));
    Entry::new(path, metadata)
}

#[async_trait]
impl Accessor for MemoryAccessor {
    fn info(&self) -> AccessorInfo {
        AccessorInfo::new(Scheme::Memory, self.root.clone(), "", self.capabilities)
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        if path == "/" {
            return Ok(());
        }
        let as_file = path.trim_end_matches('/');
        if nodes.contains_key(as_file) {
            return Err(Error::NotADirectory {
                path: path.to_string(),
                operation: Operation::CreateDir,
            });
        }
        check_ancestors(&nodes, path, Operation::CreateDir)?;
        nodes.entry(path.to_string()).or_insert_with(|| Node {
            content: Vec::new(),
            metadata: Metadata::new(EntryMode::Dir).with_last_modified(SystemTime::now()),
        });
        Ok(())
    }

    async fn read(&self, path: &str, args: OpRead) -> Result<Vec<u8>> {
        let nodes = self.nodes.read().map_err(poisoned)?;
        let node = nodes.get(path).ok_or_else(|| Error::NotFound {
            path: path.to_string(),
        })?;
        Ok(match args.range() {
            Some(range) => range.apply(&node.content).to_vec(),
            None => node.content.clone(),
        })
    }

    async fn write(&self, path: &str, data: Vec<u8>, args: OpWrite) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        check_target(&nodes, path, Operation::Write)?;

        if is_dir_path(path) {
            // Directory marker written by the create_dir emulation.
            nodes.insert(
                path.to_string(),
                Node {
                    content: Vec::new(),
                    metadata: Metadata::new(EntryMode::Dir).with_last_modified(SystemTime::now()),
                },
            );
            return Ok(());
        }

        let md5 = hex_md5(&data);
        let mut metadata = Metadata::new(EntryMode::File)
            .with_content_length(data.len() as u64)
            .with_last_modified(SystemTime::now())
            .with_etag(format!("\"{md5}\""))
            .with_content_md5(md5)
            .with_user_metadata(args.user_metadata().clone());
        if let Some(content_type) = args.content_type() {
            metadata = metadata.with_content_type(content_type);
        }
        nodes.insert(
            path.to_string(),
            Node {
                content: data,
                metadata,
            },
        );
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.nodes.write().map_err(poisoned)?.remove(path);
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<Metadata> {
        let nodes = self.nodes.read().map_err(poisoned)?;
        if let Some(node) = nodes.get(path) {
            return Ok(node.metadata.clone());
        }
        if is_dir_path(path) && dir_exists(&nodes, path) {
            return Ok(Metadata::new(EntryMode::Dir));
        }
        Err(Error::NotFound {
            path: path.to_string(),
        })
    }

    async fn list(&self, path: &str, args: OpList) -> Result<Lister> {
        let nodes = self.nodes.read().map_err(poisoned)?;
        let prefix = child_prefix(path);

        // Ordered map keyed by path, so implied directories dedup naturally.
        let mut found: BTreeMap<String, Entry> = BTreeMap::new();
        let children = nodes
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| key.len() > prefix.len());

        for (key, node) in children {
            let rest = &key[prefix.len()..];
            if args.recursive() {
                for (idx, _) in rest.match_indices('/') {
                    let dir = &key[..prefix.len() + idx + 1];
                    found
                        .entry(dir.to_string())
                        .or_insert_with(|| dir_entry(dir.to_string(), &nodes));
                }
                if !is_dir_path(key) {
                    found.insert(key.clone(), Entry::new(key.clone(), node.metadata.clone()));
                }
            } else {
                match rest.find('/') {
                    Some(idx) => {
                        let dir = &key[..prefix.len() + idx + 1];
                        found
                            .entry(dir.to_string())
                            .or_insert_with(|| dir_entry(dir.to_string(), &nodes));
                    }
                    None => {
                        found.insert(key.clone(), Entry::new(key.clone(), node.metadata.clone()));
                    }
                }
            }
        }

        Ok(Lister::from_vec(found.into_values().collect()))
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        let mut node = nodes.get(from).cloned().ok_or_else(|| Error::NotFound {
            path: from.to_string(),
        })?;
        check_target(&nodes, to, Operation::Copy)?;
        node.metadata = node.metadata.with_last_modified(SystemTime::now());
        nodes.insert(to.to_string(), node);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        if !nodes.contains_key(from) {
            return Err(Error::NotFound {
                path: from.to_string(),
            });
        }
        check_target(&nodes, to, Operation::Rename)?;
        if let Some(node) = nodes.remove(from) {
            nodes.insert(to.to_string(), node);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BytesRange, ErrorKind};
    use pretty_assertions::assert_eq;

    async fn paths(acc: &MemoryAccessor, dir: &str, recursive: bool) -> Vec<String> {
        acc.list(dir, OpList::new().with_recursive(recursive))
            .await
            .unwrap()
            .collect_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.path().to_string())
            .collect()
    }

    async fn seeded() -> MemoryAccessor {
        let acc = MemoryAccessor::default();
        for path in ["a", "dir/b", "dir/sub/c", "dir/sub/d", "z"] {
            acc.write(path, path.as_bytes().to_vec(), OpWrite::new())
                .await
                .unwrap();
        }
        acc.create_dir("empty/").await.unwrap();
        acc
    }

    #[tokio::test]
    async fn list_direct_children_derives_dirs() {
        let acc = seeded().await;
        assert_eq!(paths(&acc, "/", false).await, vec!["a", "dir/", "empty/", "z"]);
        assert_eq!(paths(&acc, "dir/", false).await, vec!["dir/b", "dir/sub/"]);
        assert!(paths(&acc, "empty/", false).await.is_empty());
        assert!(paths(&acc, "nowhere/", false).await.is_empty());
    }

    #[tokio::test]
    async fn list_recursive_is_ordered() {
        let acc = seeded().await;
        assert_eq!(
            paths(&acc, "dir/", true).await,
            vec!["dir/b", "dir/sub/", "dir/sub/c", "dir/sub/d"]
        );
    }

    #[tokio::test]
    async fn stat_dirs_and_files() {
        let acc = seeded().await;
        assert!(acc.stat("/").await.unwrap().is_dir());
        assert!(acc.stat("dir/sub/").await.unwrap().is_dir());
        assert!(acc.stat("empty/").await.unwrap().is_dir());
        assert_eq!(acc.stat("dir/").await.unwrap().last_modified(), None);

        let meta = acc.stat("dir/b").await.unwrap();
        assert_eq!(meta.content_length(), Some(5));
        assert_eq!(meta.content_md5(), Some(hex_md5(b"dir/b").as_str()));
        assert!(meta.last_modified().is_some());

        let err = acc.stat("dir/missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn write_stores_content_type_and_tags() {
        let acc = MemoryAccessor::default();
        let args = OpWrite::new()
            .with_content_type("text/plain")
            .with_user_metadata("owner", "ops");
        acc.write("f", b"x".to_vec(), args).await.unwrap();
        let meta = acc.stat("f").await.unwrap();
        assert_eq!(meta.content_type(), Some("text/plain"));
        assert_eq!(meta.user_metadata()["owner"], "ops");
    }

    #[tokio::test]
    async fn md5_of_empty_content() {
        let acc = MemoryAccessor::default();
        acc.write("e", Vec::new(), OpWrite::new()).await.unwrap();
        let meta = acc.stat("e").await.unwrap();
        assert_eq!(meta.content_md5(), Some("d41d8cd98f00b204e9800998ecf8427e"));
        assert_eq!(meta.etag(), Some("\"d41d8cd98f00b204e9800998ecf8427e\""));
    }

    #[tokio::test]
    async fn ranged_read() {
        let acc = MemoryAccessor::default();
        acc.write("f", b"hello world".to_vec(), OpWrite::new())
            .await
            .unwrap();
        let args = OpRead::new().with_range(BytesRange::new(6, Some(5)));
        assert_eq!(acc.read("f", args).await.unwrap(), b"world");
    }

    #[tokio::test]
    async fn files_and_dirs_do_not_collide() {
        let acc = seeded().await;
        let err = acc.write("dir", vec![], OpWrite::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IsADirectory);

        let err = acc.write("a/x", vec![], OpWrite::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);

        let err = acc.create_dir("a/").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);
    }

    #[tokio::test]
    async fn copy_and_rename_do_not_land_on_dirs() {
        let acc = seeded().await;
        let err = acc.copy("a", "dir").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IsADirectory);
        let err = acc.rename("z", "dir").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IsADirectory);
        let err = acc.copy("z", "a/x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);

        assert!(acc.stat("dir").await.unwrap_err().is_not_found());
        assert_eq!(acc.read("z", OpRead::new()).await.unwrap(), b"z");
        assert_eq!(paths(&acc, "dir/", false).await, vec!["dir/b", "dir/sub/"]);
    }

    #[tokio::test]
    async fn create_dir_and_delete_are_idempotent() {
        let acc = MemoryAccessor::default();
        acc.create_dir("d/").await.unwrap();
        acc.create_dir("d/").await.unwrap();
        acc.delete("d/").await.unwrap();
        acc.delete("d/").await.unwrap();
        acc.delete("never").await.unwrap();
        assert!(acc.stat("d/").await.is_err());
    }

    #[tokio::test]
    async fn native_copy_and_rename() {
        let acc = seeded().await;
        acc.copy("a", "copy/a").await.unwrap();
        assert_eq!(acc.read("copy/a", OpRead::new()).await.unwrap(), b"a");

        acc.rename("z", "moved/z").await.unwrap();
        assert_eq!(acc.read("moved/z", OpRead::new()).await.unwrap(), b"z");
        assert!(acc.stat("z").await.unwrap_err().is_not_found());

        let err = acc.rename("missing", "x").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn from_config_reads_root() {
        let mut config = ConfigMap::from_iter([("root", "/data")]);
        let acc = MemoryAccessor::from_config(&mut config).unwrap();
        assert_eq!(acc.info().root(), "/data/");
        config.finish().unwrap();
    }

    #[test]
    fn without_drops_capability() {
        let acc = MemoryAccessor::default().without(Capability::Copy);
        let caps = acc.info().capabilities();
        assert!(!caps.contains(Capability::Copy));
        assert!(caps.contains(Capability::Rename));
    }
}
