//! Local filesystem implementation of [`OrbitSystem`].
//!
//! Wraps `tokio::fs` operations rooted at a single directory; every
//! [`RelPath`] is resolved against that root before touching disk.

use async_trait::async_trait;
use orbit_core_interface::{
    AsyncReader, AsyncWriter, CopyProgress, DirEntry, FileAttrs, FileCopyResult, FolderAttrs,
    ItemType, OrbitSystem, OrbitSystemError, RelPath, Result, SymlinkAttrs,
};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Hidden directory under the root used as a recycle bin.
const RECYCLE_DIR: &str = ".orbit-recycle";

/// Local filesystem device, rooted at a single directory.
#[derive(Debug, Clone)]
pub struct LocalSystem {
    root: PathBuf,
}

impl LocalSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &RelPath) -> PathBuf {
        if path.is_root() {
            self.root.clone()
        } else {
            self.root.join(path.as_str())
        }
    }

    fn map_io_err(e: std::io::Error, path: &Path) -> OrbitSystemError {
        match e.kind() {
            std::io::ErrorKind::NotFound => OrbitSystemError::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => {
                OrbitSystemError::PermissionDenied(path.display().to_string())
            }
            std::io::ErrorKind::AlreadyExists => {
                OrbitSystemError::TargetExisting(path.display().to_string())
            }
            _ => OrbitSystemError::Io(e),
        }
    }

    fn mod_time_secs(t: SystemTime) -> i64 {
        t.duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    #[cfg(unix)]
    fn file_print(meta: &std::fs::Metadata) -> u64 {
        use std::os::unix::fs::MetadataExt;
        meta.ino()
    }

    #[cfg(not(unix))]
    fn file_print(_meta: &std::fs::Metadata) -> u64 {
        0
    }
}

#[async_trait]
impl OrbitSystem for LocalSystem {
    fn device_kind(&self) -> &str {
        "local"
    }

    fn identity(&self) -> String {
        self.root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone())
            .display()
            .to_string()
    }

    async fn get_item_type(&self, path: &RelPath) -> Result<ItemType> {
        let abs = self.resolve(path);
        let meta = fs::symlink_metadata(&abs)
            .await
            .map_err(|e| Self::map_io_err(e, &abs))?;
        if meta.is_symlink() {
            Ok(ItemType::Symlink)
        } else if meta.is_dir() {
            Ok(ItemType::Folder)
        } else {
            Ok(ItemType::File)
        }
    }

    async fn item_still_exists(&self, path: &RelPath) -> Result<Option<ItemType>> {
        // Walk ancestors explicitly by re-listing each parent directory, so a
        // transient stat failure on the leaf can't be confused with "really gone".
        let mut current = RelPath::root();
        for component in path.components() {
            let entries = match self.read_dir(&current).await {
                Ok(entries) => entries,
                Err(OrbitSystemError::NotFound(_)) => return Ok(None),
                Err(e) => return Err(e),
            };
            match entries.into_iter().find(|e| e.name == component) {
                Some(entry) => {
                    current = current.join_name(&entry.name);
                    if current == *path {
                        return Ok(Some(entry.item_type));
                    }
                }
                None => return Ok(None),
            }
        }
        Ok(None)
    }

    async fn file_attrs(&self, path: &RelPath) -> Result<FileAttrs> {
        let abs = self.resolve(path);
        let meta = fs::symlink_metadata(&abs)
            .await
            .map_err(|e| Self::map_io_err(e, &abs))?;
        let is_followed_symlink = meta.is_symlink();
        let meta = if is_followed_symlink {
            fs::metadata(&abs).await.map_err(|e| Self::map_io_err(e, &abs))?
        } else {
            meta
        };
        Ok(FileAttrs {
            name: path.name().unwrap_or_default().to_string(),
            size: meta.len(),
            mod_time: Self::mod_time_secs(meta.modified().map_err(|e| Self::map_io_err(e, &abs))?),
            file_print: Self::file_print(&meta),
            is_followed_symlink,
        })
    }

    async fn folder_attrs(&self, path: &RelPath) -> Result<FolderAttrs> {
        let abs = self.resolve(path);
        let meta = fs::symlink_metadata(&abs)
            .await
            .map_err(|e| Self::map_io_err(e, &abs))?;
        Ok(FolderAttrs {
            name: path.name().unwrap_or_default().to_string(),
            is_followed_symlink: meta.is_symlink(),
        })
    }

    async fn symlink_attrs(&self, path: &RelPath) -> Result<SymlinkAttrs> {
        let abs = self.resolve(path);
        let meta = fs::symlink_metadata(&abs)
            .await
            .map_err(|e| Self::map_io_err(e, &abs))?;
        Ok(SymlinkAttrs {
            name: path.name().unwrap_or_default().to_string(),
            mod_time: Self::mod_time_secs(meta.modified().map_err(|e| Self::map_io_err(e, &abs))?),
        })
    }

    async fn read_dir(&self, path: &RelPath) -> Result<Vec<DirEntry>> {
        let abs = self.resolve(path);
        let mut dir = fs::read_dir(&abs).await.map_err(|e| Self::map_io_err(e, &abs))?;
        let mut out = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| Self::map_io_err(e, &abs))? {
            let meta = entry
                .metadata()
                .await
                .map_err(|e| Self::map_io_err(e, &entry.path()))?;
            let item_type = if meta.is_symlink() {
                ItemType::Symlink
            } else if meta.is_dir() {
                ItemType::Folder
            } else {
                ItemType::File
            };
            out.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                item_type,
            });
        }
        Ok(out)
    }

    async fn create_folder_plain(&self, path: &RelPath) -> Result<()> {
        let abs = self.resolve(path);
        fs::create_dir(&abs).await.map_err(|e| Self::map_io_err(e, &abs))
    }

    async fn create_folder_if_missing_recursively(&self, path: &RelPath) -> Result<bool> {
        let abs = self.resolve(path);
        if fs::try_exists(&abs).await.unwrap_or(false) {
            return Ok(true);
        }
        match fs::create_dir_all(&abs).await {
            Ok(()) => Ok(false),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(true),
            Err(e) => Err(Self::map_io_err(e, &abs)),
        }
    }

    async fn remove_file_plain(&self, path: &RelPath) -> Result<()> {
        let abs = self.resolve(path);
        fs::remove_file(&abs).await.map_err(|e| Self::map_io_err(e, &abs))
    }

    async fn remove_symlink_plain(&self, path: &RelPath) -> Result<()> {
        let abs = self.resolve(path);
        fs::remove_file(&abs).await.map_err(|e| Self::map_io_err(e, &abs))
    }

    async fn remove_folder_plain(&self, path: &RelPath) -> Result<()> {
        let abs = self.resolve(path);
        fs::remove_dir(&abs).await.map_err(|e| Self::map_io_err(e, &abs))
    }

    async fn move_and_rename(&self, from: &RelPath, to: &RelPath, replace_existing: bool) -> Result<()> {
        let abs_from = self.resolve(from);
        let abs_to = self.resolve(to);

        if !replace_existing {
            if let Ok(to_meta) = fs::symlink_metadata(&abs_to).await {
                let from_meta = fs::symlink_metadata(&abs_from)
                    .await
                    .map_err(|e| Self::map_io_err(e, &abs_from))?;
                if Self::file_print(&from_meta) != 0
                    && Self::file_print(&from_meta) == Self::file_print(&to_meta)
                {
                    // Same underlying file already: idempotent rename, accept.
                    return Ok(());
                }
                return Err(OrbitSystemError::TargetExisting(abs_to.display().to_string()));
            }
        }

        if let Some(parent) = abs_to.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_err(e, parent))?;
        }
        fs::rename(&abs_from, &abs_to)
            .await
            .map_err(|e| Self::map_io_err(e, &abs_from))
    }

    async fn open_input(&self, path: &RelPath) -> Result<AsyncReader> {
        let abs = self.resolve(path);
        let file = fs::File::open(&abs).await.map_err(|e| Self::map_io_err(e, &abs))?;
        Ok(Box::new(file))
    }

    async fn open_output(
        &self,
        path: &RelPath,
        size_hint: Option<u64>,
        _mod_time: Option<i64>,
    ) -> Result<AsyncWriter> {
        let abs = self.resolve(path);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_err(e, parent))?;
        }
        let file = fs::File::create(&abs).await.map_err(|e| Self::map_io_err(e, &abs))?;
        if let Some(size) = size_hint {
            let _ = file.set_len(size).await;
        }
        Ok(Box::new(file))
    }

    async fn copy_new_file(
        &self,
        src: &RelPath,
        dst: &RelPath,
        progress: &(dyn CopyProgress),
    ) -> Result<FileCopyResult> {
        let abs_src = self.resolve(src);
        let abs_dst = self.resolve(dst);

        if fs::try_exists(&abs_dst).await.unwrap_or(false) {
            return Err(OrbitSystemError::TargetExisting(abs_dst.display().to_string()));
        }
        if let Some(parent) = abs_dst.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_err(e, parent))?;
        }

        let src_meta = fs::metadata(&abs_src).await.map_err(|e| Self::map_io_err(e, &abs_src))?;
        let mut reader = fs::File::open(&abs_src).await.map_err(|e| Self::map_io_err(e, &abs_src))?;
        let mut writer = fs::File::create(&abs_dst).await.map_err(|e| Self::map_io_err(e, &abs_dst))?;
        let _ = writer.set_len(src_meta.len()).await;

        let mut buf = vec![0u8; 256 * 1024];
        let mut bytes_copied = 0u64;
        loop {
            let n = reader.read(&mut buf).await.map_err(|e| Self::map_io_err(e, &abs_src))?;
            if n == 0 {
                break;
            }
            tokio::io::AsyncWriteExt::write_all(&mut writer, &buf[..n])
                .await
                .map_err(|e| Self::map_io_err(e, &abs_dst))?;
            bytes_copied += n as u64;
            if !progress.on_bytes(n as u64) {
                return Err(OrbitSystemError::Cancelled);
            }
        }
        tokio::io::AsyncWriteExt::flush(&mut writer)
            .await
            .map_err(|e| Self::map_io_err(e, &abs_dst))?;
        drop(writer);

        let mod_time = src_meta
            .modified()
            .map(Self::mod_time_secs)
            .unwrap_or_else(|_| orbit_core_interface::now_secs());
        let mod_time_error = filetime::set_file_mtime(&abs_dst, filetime::FileTime::from_unix_time(mod_time, 0))
            .err()
            .map(|e| e.to_string());

        let dst_meta = fs::symlink_metadata(&abs_dst).await.ok();
        Ok(FileCopyResult {
            bytes_copied,
            src_file_print: Self::file_print(&src_meta),
            dst_file_print: dst_meta.as_ref().map(Self::file_print).unwrap_or(0),
            mod_time_error,
        })
    }

    async fn copy_symlink(&self, src: &RelPath, dst: &RelPath) -> Result<()> {
        let abs_src = self.resolve(src);
        let abs_dst = self.resolve(dst);
        let target = fs::read_link(&abs_src).await.map_err(|e| Self::map_io_err(e, &abs_src))?;
        if let Some(parent) = abs_dst.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_err(e, parent))?;
        }
        #[cfg(unix)]
        {
            tokio::fs::symlink(&target, &abs_dst)
                .await
                .map_err(|e| Self::map_io_err(e, &abs_dst))
        }
        #[cfg(windows)]
        {
            if target.is_dir() {
                tokio::fs::symlink_dir(&target, &abs_dst)
                    .await
                    .map_err(|e| Self::map_io_err(e, &abs_dst))
            } else {
                tokio::fs::symlink_file(&target, &abs_dst)
                    .await
                    .map_err(|e| Self::map_io_err(e, &abs_dst))
            }
        }
    }

    async fn copy_item_permissions(
        &self,
        src: &RelPath,
        dst: &RelPath,
        item_type: ItemType,
    ) -> Result<()> {
        if item_type == ItemType::Symlink {
            return Ok(());
        }
        let abs_src = self.resolve(src);
        let abs_dst = self.resolve(dst);
        let meta = fs::metadata(&abs_src).await.map_err(|e| Self::map_io_err(e, &abs_src))?;
        fs::set_permissions(&abs_dst, meta.permissions())
            .await
            .map_err(|e| Self::map_io_err(e, &abs_dst))
    }

    async fn get_free_disk_space(&self, path: &RelPath) -> Result<u64> {
        let abs = self.resolve(path);
        let mut sys = sysinfo::Disks::new_with_refreshed_list();
        sys.refresh(true);
        let mut best: Option<u64> = None;
        let mut best_len = 0usize;
        for disk in sys.list() {
            let mount = disk.mount_point();
            if abs.starts_with(mount) {
                let len = mount.as_os_str().len();
                if len >= best_len {
                    best_len = len;
                    best = Some(disk.available_space());
                }
            }
        }
        Ok(best.unwrap_or(0))
    }

    fn supports_recycle_bin(&self) -> bool {
        true
    }

    async fn recycle_item_if_exists(&self, path: &RelPath) -> Result<()> {
        if self.item_still_exists(path).await?.is_none() {
            return Ok(());
        }
        let abs = self.resolve(path);
        let recycle_root = self.root.join(RECYCLE_DIR);
        fs::create_dir_all(&recycle_root)
            .await
            .map_err(|e| Self::map_io_err(e, &recycle_root))?;
        let name = path.as_str().replace('/', "__");
        let stamped = format!("{}.{}", name, orbit_core_interface::now_secs());
        let target = recycle_root.join(stamped);
        fs::rename(&abs, &target).await.map_err(|e| Self::map_io_err(e, &abs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_core_interface::NoopProgress;

    #[tokio::test]
    async fn create_and_list_folder() {
        let dir = tempfile::tempdir().unwrap();
        let sys = LocalSystem::new(dir.path());
        let sub = RelPath::new("sub");
        assert!(!sys.create_folder_if_missing_recursively(&sub).await.unwrap());
        assert!(sys.create_folder_if_missing_recursively(&sub).await.unwrap());

        let entries = sys.read_dir(&RelPath::root()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "sub");
        assert_eq!(entries[0].item_type, ItemType::Folder);
    }

    #[tokio::test]
    async fn copy_new_file_rejects_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let sys = LocalSystem::new(dir.path());
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"already there").unwrap();

        let result = sys
            .copy_new_file(&RelPath::new("a.txt"), &RelPath::new("b.txt"), &NoopProgress)
            .await;
        assert!(matches!(result, Err(OrbitSystemError::TargetExisting(_))));
    }

    #[tokio::test]
    async fn copy_new_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let sys = LocalSystem::new(dir.path());
        std::fs::write(dir.path().join("a.txt"), b"hello world").unwrap();

        let result = sys
            .copy_new_file(&RelPath::new("a.txt"), &RelPath::new("c.txt"), &NoopProgress)
            .await
            .unwrap();
        assert_eq!(result.bytes_copied, 11);
        assert_eq!(std::fs::read(dir.path().join("c.txt")).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn item_still_exists_reports_absence() {
        let dir = tempfile::tempdir().unwrap();
        let sys = LocalSystem::new(dir.path());
        assert_eq!(
            sys.item_still_exists(&RelPath::new("ghost.txt")).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn recycle_moves_item_aside() {
        let dir = tempfile::tempdir().unwrap();
        let sys = LocalSystem::new(dir.path());
        std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
        sys.recycle_item_if_exists(&RelPath::new("a.txt")).await.unwrap();
        assert!(!dir.path().join("a.txt").exists());
        let recycled = std::fs::read_dir(dir.path().join(RECYCLE_DIR)).unwrap().count();
        assert_eq!(recycled, 1);
    }
}
