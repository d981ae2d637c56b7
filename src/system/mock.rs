//! In-memory [`OrbitSystem`] implementation used by the sync engine's own
//! test suite, so tree/category/direction tests don't need a real disk.

use async_trait::async_trait;
use orbit_core_interface::{
    AsyncReader, AsyncWriter, CopyProgress, DirEntry, FileAttrs, FileCopyResult, FolderAttrs,
    ItemType, OrbitSystem, OrbitSystemError, RelPath, Result, SymlinkAttrs,
};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[derive(Debug, Clone)]
enum MockNode {
    File {
        data: Vec<u8>,
        mod_time: i64,
        file_print: u64,
    },
    Folder,
    Symlink {
        target: String,
        mod_time: i64,
    },
}

type Entries = Arc<RwLock<HashMap<RelPath, MockNode>>>;

/// In-memory device. Every path lives in a flat map keyed by its
/// normalized [`RelPath`]; the root itself is never stored and always
/// reports as an existing folder.
#[derive(Debug, Clone)]
pub struct MockSystem {
    id: String,
    entries: Entries,
    recycled: Arc<RwLock<Vec<RelPath>>>,
    next_print: Arc<RwLock<u64>>,
    recycle_bin_supported: bool,
}

impl MockSystem {
    pub fn new() -> Self {
        Self::with_id("mock")
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: Arc::new(RwLock::new(HashMap::new())),
            recycled: Arc::new(RwLock::new(Vec::new())),
            next_print: Arc::new(RwLock::new(1)),
            recycle_bin_supported: true,
        }
    }

    /// Builder knob for devices without a recycle bin (e.g. a plain SFTP
    /// mount), used to exercise the prefer-recycle-but-unsupported path.
    pub fn without_recycle_bin(mut self) -> Self {
        self.recycle_bin_supported = false;
        self
    }

    fn alloc_print(&self) -> u64 {
        let mut n = self.next_print.write().unwrap();
        let v = *n;
        *n += 1;
        v
    }

    pub fn add_file(&self, path: impl Into<RelPath>, data: &[u8], mod_time: i64) {
        let print = self.alloc_print();
        self.entries.write().unwrap().insert(
            path.into(),
            MockNode::File {
                data: data.to_vec(),
                mod_time,
                file_print: print,
            },
        );
    }

    pub fn add_folder(&self, path: impl Into<RelPath>) {
        self.entries.write().unwrap().insert(path.into(), MockNode::Folder);
    }

    pub fn add_symlink(&self, path: impl Into<RelPath>, target: &str, mod_time: i64) {
        self.entries.write().unwrap().insert(
            path.into(),
            MockNode::Symlink {
                target: target.to_string(),
                mod_time,
            },
        );
    }

    pub fn contains(&self, path: &RelPath) -> bool {
        self.entries.read().unwrap().contains_key(path)
    }

    pub fn recycled(&self) -> Vec<RelPath> {
        self.recycled.read().unwrap().clone()
    }

    pub fn file_data(&self, path: &RelPath) -> Option<Vec<u8>> {
        match self.entries.read().unwrap().get(path) {
            Some(MockNode::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    fn item_type_of(node: &MockNode) -> ItemType {
        match node {
            MockNode::File { .. } => ItemType::File,
            MockNode::Folder => ItemType::Folder,
            MockNode::Symlink { .. } => ItemType::Symlink,
        }
    }
}

impl Default for MockSystem {
    fn default() -> Self {
        Self::new()
    }
}

struct MockWriter {
    entries: Entries,
    path: RelPath,
}

impl AsyncWrite for MockWriter {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        let mut map = self.entries.write().unwrap();
        match map.get_mut(&self.path) {
            Some(MockNode::File { data, .. }) => {
                data.extend_from_slice(buf);
            }
            _ => {
                map.insert(
                    self.path.clone(),
                    MockNode::File {
                        data: buf.to_vec(),
                        mod_time: orbit_core_interface::now_secs(),
                        file_print: 0,
                    },
                );
            }
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

struct MockReader {
    data: Vec<u8>,
    pos: usize,
}

impl AsyncRead for MockReader {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        self.pos += n;
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl OrbitSystem for MockSystem {
    fn device_kind(&self) -> &str {
        "mock"
    }

    fn identity(&self) -> String {
        self.id.clone()
    }

    async fn get_item_type(&self, path: &RelPath) -> Result<ItemType> {
        if path.is_root() {
            return Ok(ItemType::Folder);
        }
        self.entries
            .read()
            .unwrap()
            .get(path)
            .map(Self::item_type_of)
            .ok_or_else(|| OrbitSystemError::NotFound(path.to_string()))
    }

    async fn item_still_exists(&self, path: &RelPath) -> Result<Option<ItemType>> {
        if path.is_root() {
            return Ok(Some(ItemType::Folder));
        }
        Ok(self.entries.read().unwrap().get(path).map(Self::item_type_of))
    }

    async fn file_attrs(&self, path: &RelPath) -> Result<FileAttrs> {
        match self.entries.read().unwrap().get(path) {
            Some(MockNode::File { data, mod_time, file_print }) => Ok(FileAttrs {
                name: path.name().unwrap_or_default().to_string(),
                size: data.len() as u64,
                mod_time: *mod_time,
                file_print: *file_print,
                is_followed_symlink: false,
            }),
            _ => Err(OrbitSystemError::NotFound(path.to_string())),
        }
    }

    async fn folder_attrs(&self, path: &RelPath) -> Result<FolderAttrs> {
        match self.entries.read().unwrap().get(path) {
            Some(MockNode::Folder) => Ok(FolderAttrs {
                name: path.name().unwrap_or_default().to_string(),
                is_followed_symlink: false,
            }),
            _ => Err(OrbitSystemError::NotFound(path.to_string())),
        }
    }

    async fn symlink_attrs(&self, path: &RelPath) -> Result<SymlinkAttrs> {
        match self.entries.read().unwrap().get(path) {
            Some(MockNode::Symlink { mod_time, .. }) => Ok(SymlinkAttrs {
                name: path.name().unwrap_or_default().to_string(),
                mod_time: *mod_time,
            }),
            _ => Err(OrbitSystemError::NotFound(path.to_string())),
        }
    }

    async fn read_dir(&self, path: &RelPath) -> Result<Vec<DirEntry>> {
        if !path.is_root() && !self.contains(path) {
            return Err(OrbitSystemError::NotFound(path.to_string()));
        }
        let map = self.entries.read().unwrap();
        let mut out = Vec::new();
        for (candidate, node) in map.iter() {
            if candidate.parent().as_ref() == Some(path) {
                out.push(DirEntry {
                    name: candidate.name().unwrap_or_default().to_string(),
                    item_type: Self::item_type_of(node),
                });
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn create_folder_plain(&self, path: &RelPath) -> Result<()> {
        let mut map = self.entries.write().unwrap();
        if map.contains_key(path) {
            return Err(OrbitSystemError::TargetExisting(path.to_string()));
        }
        map.insert(path.clone(), MockNode::Folder);
        Ok(())
    }

    async fn create_folder_if_missing_recursively(&self, path: &RelPath) -> Result<bool> {
        if self.contains(path) {
            return Ok(true);
        }
        let mut ancestors = Vec::new();
        let mut current = path.clone();
        while !current.is_root() {
            ancestors.push(current.clone());
            current = current.parent().unwrap();
        }
        let mut map = self.entries.write().unwrap();
        for ancestor in ancestors.into_iter().rev() {
            map.entry(ancestor).or_insert(MockNode::Folder);
        }
        Ok(false)
    }

    async fn remove_file_plain(&self, path: &RelPath) -> Result<()> {
        let mut map = self.entries.write().unwrap();
        match map.remove(path) {
            Some(MockNode::File { .. }) => Ok(()),
            Some(other) => {
                map.insert(path.clone(), other);
                Err(OrbitSystemError::System("not a file".to_string()))
            }
            None => Err(OrbitSystemError::NotFound(path.to_string())),
        }
    }

    async fn remove_symlink_plain(&self, path: &RelPath) -> Result<()> {
        let mut map = self.entries.write().unwrap();
        match map.remove(path) {
            Some(MockNode::Symlink { .. }) => Ok(()),
            Some(other) => {
                map.insert(path.clone(), other);
                Err(OrbitSystemError::System("not a symlink".to_string()))
            }
            None => Err(OrbitSystemError::NotFound(path.to_string())),
        }
    }

    async fn remove_folder_plain(&self, path: &RelPath) -> Result<()> {
        let mut map = self.entries.write().unwrap();
        match map.remove(path) {
            Some(MockNode::Folder) => Ok(()),
            Some(other) => {
                map.insert(path.clone(), other);
                Err(OrbitSystemError::System("not a folder".to_string()))
            }
            None => Err(OrbitSystemError::NotFound(path.to_string())),
        }
    }

    async fn move_and_rename(&self, from: &RelPath, to: &RelPath, replace_existing: bool) -> Result<()> {
        let mut map = self.entries.write().unwrap();
        if !replace_existing && map.contains_key(to) {
            return Err(OrbitSystemError::TargetExisting(to.to_string()));
        }
        let node = map
            .remove(from)
            .ok_or_else(|| OrbitSystemError::NotFound(from.to_string()))?;
        map.insert(to.clone(), node);
        Ok(())
    }

    async fn open_input(&self, path: &RelPath) -> Result<AsyncReader> {
        match self.entries.read().unwrap().get(path) {
            Some(MockNode::File { data, .. }) => Ok(Box::new(MockReader {
                data: data.clone(),
                pos: 0,
            })),
            _ => Err(OrbitSystemError::NotFound(path.to_string())),
        }
    }

    async fn open_output(
        &self,
        path: &RelPath,
        _size_hint: Option<u64>,
        mod_time: Option<i64>,
    ) -> Result<AsyncWriter> {
        self.entries.write().unwrap().insert(
            path.clone(),
            MockNode::File {
                data: Vec::new(),
                mod_time: mod_time.unwrap_or_else(orbit_core_interface::now_secs),
                file_print: 0,
            },
        );
        Ok(Box::new(MockWriter {
            entries: self.entries.clone(),
            path: path.clone(),
        }))
    }

    async fn copy_new_file(
        &self,
        src: &RelPath,
        dst: &RelPath,
        progress: &(dyn CopyProgress),
    ) -> Result<FileCopyResult> {
        if self.contains(dst) {
            return Err(OrbitSystemError::TargetExisting(dst.to_string()));
        }
        let (data, mod_time, src_print) = match self.entries.read().unwrap().get(src) {
            Some(MockNode::File { data, mod_time, file_print }) => (data.clone(), *mod_time, *file_print),
            _ => return Err(OrbitSystemError::NotFound(src.to_string())),
        };
        if !progress.on_bytes(data.len() as u64) {
            return Err(OrbitSystemError::Cancelled);
        }
        let dst_print = self.alloc_print();
        self.entries.write().unwrap().insert(
            dst.clone(),
            MockNode::File {
                data: data.clone(),
                mod_time,
                file_print: dst_print,
            },
        );
        Ok(FileCopyResult {
            bytes_copied: data.len() as u64,
            src_file_print: src_print,
            dst_file_print: dst_print,
            mod_time_error: None,
        })
    }

    async fn copy_symlink(&self, src: &RelPath, dst: &RelPath) -> Result<()> {
        let node = match self.entries.read().unwrap().get(src) {
            Some(node @ MockNode::Symlink { .. }) => node.clone(),
            _ => return Err(OrbitSystemError::NotFound(src.to_string())),
        };
        self.entries.write().unwrap().insert(dst.clone(), node);
        Ok(())
    }

    async fn copy_item_permissions(&self, _src: &RelPath, _dst: &RelPath, _item_type: ItemType) -> Result<()> {
        Ok(())
    }

    async fn get_free_disk_space(&self, _path: &RelPath) -> Result<u64> {
        Ok(u64::MAX / 2)
    }

    fn supports_recycle_bin(&self) -> bool {
        self.recycle_bin_supported
    }

    async fn recycle_item_if_exists(&self, path: &RelPath) -> Result<()> {
        let removed = self.entries.write().unwrap().remove(path);
        if removed.is_some() {
            self.recycled.write().unwrap().push(path.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn basic_round_trip() {
        let sys = MockSystem::new();
        sys.add_file(RelPath::new("a.txt"), b"hello", 100);

        assert_eq!(sys.get_item_type(&RelPath::new("a.txt")).await.unwrap(), ItemType::File);
        let attrs = sys.file_attrs(&RelPath::new("a.txt")).await.unwrap();
        assert_eq!(attrs.size, 5);
        assert_eq!(attrs.mod_time, 100);
    }

    #[tokio::test]
    async fn read_dir_lists_direct_children_only() {
        let sys = MockSystem::new();
        sys.add_folder(RelPath::new("dir"));
        sys.add_file(RelPath::new("dir/a.txt"), b"x", 1);
        sys.add_file(RelPath::new("dir/sub/b.txt"), b"y", 1);

        let entries = sys.read_dir(&RelPath::new("dir")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.txt");
    }

    #[tokio::test]
    async fn copy_new_file_rejects_existing_target() {
        let sys = MockSystem::new();
        sys.add_file(RelPath::new("a.txt"), b"x", 1);
        sys.add_file(RelPath::new("b.txt"), b"y", 1);
        let err = sys
            .copy_new_file(&RelPath::new("a.txt"), &RelPath::new("b.txt"), &orbit_core_interface::NoopProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, OrbitSystemError::TargetExisting(_)));
    }

    #[tokio::test]
    async fn recycle_removes_and_records() {
        let sys = MockSystem::new();
        sys.add_file(RelPath::new("a.txt"), b"x", 1);
        sys.recycle_item_if_exists(&RelPath::new("a.txt")).await.unwrap();
        assert!(!sys.contains(&RelPath::new("a.txt")));
        assert_eq!(sys.recycled(), vec![RelPath::new("a.txt")]);
    }
}
