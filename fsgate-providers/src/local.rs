// SPDX-License-Identifier: AGPL-3.0-or-later
//! Local filesystem backend

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fsgate_core::{
    backend::{BackendKind, ByteStream, Storage},
    context::OpContext,
    entry::FileEntry,
    error::{StorageError, StorageResult},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

/// Local backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Directory every request is confined to
    pub root_path: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self { root_path: PathBuf::from("./data") }
    }
}

/// Local filesystem backend rooted at a single directory
#[derive(Debug)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Resolve `root` to an absolute path and create it if missing.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref();
        let absolute = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(StorageError::unknown)?
                .join(root)
        };
        let root = lexical_clean(&absolute);

        std::fs::create_dir_all(&root)
            .map_err(|e| StorageError::from_io(e, root.display().to_string()))?;

        tracing::debug!(root = %root.display(), "local backend ready");
        Ok(Self { root })
    }

    pub fn from_config(config: &LocalConfig) -> StorageResult<Self> {
        Self::new(&config.root_path)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a caller-relative path onto the filesystem, refusing anything
    /// that lands outside the root.
    pub fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        if path.is_empty() || path == "/" {
            return Ok(self.root.clone());
        }

        let joined = self.root.join(path.trim_start_matches('/'));
        let cleaned = lexical_clean(&joined);

        // Path::starts_with compares whole components, so a sibling such as
        // `/data-evil` is not inside `/data`.
        if !cleaned.starts_with(&self.root) {
            tracing::warn!(path, "rejected path outside storage root");
            return Err(StorageError::PermissionDenied(path.to_string()));
        }
        Ok(cleaned)
    }

    fn relative(&self, real: &Path) -> String {
        let rel: Vec<String> = real
            .strip_prefix(&self.root)
            .map(|p| {
                p.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        if rel.is_empty() {
            ".".to_string()
        } else {
            rel.join("/")
        }
    }

    fn entry_for(&self, real: &Path, meta: &std::fs::Metadata) -> FileEntry {
        let name = real
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string());
        let mod_time = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        FileEntry {
            name,
            path: self.relative(real),
            size: meta.len(),
            is_dir: meta.is_dir(),
            mod_time,
        }
    }

    fn resolve_mutable(&self, path: &str) -> StorageResult<PathBuf> {
        let real = self.resolve(path)?;
        if real == self.root {
            return Err(StorageError::PermissionDenied(path.to_string()));
        }
        Ok(real)
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[async_trait]
impl Storage for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn list(&self, ctx: &OpContext, path: &str) -> StorageResult<Vec<FileEntry>> {
        let real = self.resolve(path)?;
        ctx.check()?;

        let meta = fs::metadata(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path))?;
        if !meta.is_dir() {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let mut read_dir = fs::read_dir(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| StorageError::from_io(e, path))?
        {
            let entry_path = entry.path();
            let meta = entry
                .metadata()
                .await
                .map_err(|e| StorageError::from_io(e, self.relative(&entry_path)))?;
            entries.push(self.entry_for(&entry_path, &meta));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read(&self, ctx: &OpContext, path: &str) -> StorageResult<ByteStream> {
        let real = self.resolve(path)?;
        ctx.check()?;

        let file = fs::File::open(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path))?;
        let meta = file
            .metadata()
            .await
            .map_err(|e| StorageError::from_io(e, path))?;
        if meta.is_dir() {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let owned = path.to_string();
        let stream = ReaderStream::new(file)
            .map(move |chunk| chunk.map_err(|e| StorageError::from_io(e, owned.clone())));
        Ok(Box::pin(stream))
    }

    async fn write(&self, ctx: &OpContext, path: &str, mut data: ByteStream) -> StorageResult<()> {
        let real = self.resolve_mutable(path)?;
        ctx.check()?;

        let parent = real.parent().unwrap_or(self.root.as_path());
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::from_io(e, path))?;

        // Content lands in a sibling staging file and replaces the target
        // only once the whole stream has been written.
        ctx.check()?;
        let (staged, staged_path) = staging_file(parent)
            .map_err(|e| StorageError::from_io(e, path))?
            .into_parts();
        let mut file = fs::File::from_std(staged);

        let mut written = 0u64;
        while let Some(chunk) = data.next().await {
            let chunk = chunk?;
            ctx.check()?;
            file.write_all(&chunk)
                .await
                .map_err(|e| StorageError::unknown(io_context(e, "write file")))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| StorageError::unknown(io_context(e, "flush file")))?;
        drop(file);

        ctx.check()?;
        staged_path
            .persist(&real)
            .map_err(|e| StorageError::from_io(e.error, path))?;

        tracing::debug!(path, bytes = written, "file written");
        Ok(())
    }

    async fn delete(&self, ctx: &OpContext, path: &str) -> StorageResult<()> {
        let real = self.resolve_mutable(path)?;
        ctx.check()?;

        let meta = fs::symlink_metadata(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path))?;
        let removed = if meta.is_dir() {
            fs::remove_dir(&real).await
        } else {
            fs::remove_file(&real).await
        };
        removed.map_err(|e| StorageError::from_io(e, path))
    }

    async fn stat(&self, ctx: &OpContext, path: &str) -> StorageResult<FileEntry> {
        let real = self.resolve(path)?;
        ctx.check()?;

        let meta = fs::metadata(&real)
            .await
            .map_err(|e| StorageError::from_io(e, path))?;
        Ok(self.entry_for(&real, &meta))
    }
}

fn staging_file(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".fsgate-upload-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }
    builder.tempfile_in(dir)
}

fn io_context(err: io::Error, what: &str) -> io::Error {
    io::Error::new(err.kind(), format!("{what}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use fsgate_core::{collect_stream, stream_from_bytes, ErrorKind};
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn new_backend() -> (TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path()).unwrap();
        (dir, backend)
    }

    async fn read_all(backend: &LocalBackend, path: &str) -> StorageResult<Vec<u8>> {
        let stream = backend.read(&OpContext::new(), path).await?;
        Ok(collect_stream(stream).await?.to_vec())
    }

    #[test]
    fn test_new_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("root");
        let backend = LocalBackend::new(&root).unwrap();
        assert!(root.is_dir());
        assert!(backend.root().is_absolute());
    }

    #[test]
    fn test_new_cleans_root() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path().join("a").join("..").join("b")).unwrap();
        assert_eq!(backend.root(), dir.path().join("b"));
    }

    #[test]
    fn test_resolve_root() {
        let (_dir, backend) = new_backend();
        assert_eq!(backend.resolve("").unwrap(), backend.root());
        assert_eq!(backend.resolve("/").unwrap(), backend.root());
        assert_eq!(backend.resolve(".").unwrap(), backend.root());
    }

    #[test]
    fn test_resolve_valid_paths() {
        let (_dir, backend) = new_backend();
        for path in ["file.txt", "sub/dir/file.txt", "/docs/readme.md", "a/./b", "a/../b"] {
            let resolved = backend.resolve(path).unwrap();
            assert!(resolved.starts_with(backend.root()), "{path}");
        }
        assert_eq!(backend.resolve("a/../b").unwrap(), backend.root().join("b"));
    }

    #[test]
    fn test_resolve_blocks_traversal() {
        let (_dir, backend) = new_backend();
        for path in [
            "../../etc/passwd",
            "/../../etc/passwd",
            "sub/../../etc/passwd",
            "..",
            "a/../../..",
        ] {
            let err = backend.resolve(path).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PermissionDenied, "{path}");
        }
    }

    #[test]
    fn test_resolve_blocks_sibling_with_shared_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path().join("data")).unwrap();
        std::fs::create_dir_all(dir.path().join("data-evil")).unwrap();

        let err = backend.resolve("../data-evil/secret").unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn test_list_empty_dir() {
        let (_dir, backend) = new_backend();
        let files = backend.list(&OpContext::new(), "/").await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_list_file_and_subdir() {
        let (_dir, backend) = new_backend();
        std::fs::write(backend.root().join("a.txt"), b"aaa").unwrap();
        std::fs::create_dir(backend.root().join("sub")).unwrap();

        let files = backend.list(&OpContext::new(), "").await.unwrap();
        assert_eq!(files.len(), 2);

        assert_eq!(files[0].name, "a.txt");
        assert_eq!(files[0].path, "a.txt");
        assert_eq!(files[0].size, 3);
        assert!(!files[0].is_dir);

        assert_eq!(files[1].name, "sub");
        assert_eq!(files[1].path, "sub");
        assert!(files[1].is_dir);
    }

    #[tokio::test]
    async fn test_list_subdir_paths_are_root_relative() {
        let (_dir, backend) = new_backend();
        std::fs::create_dir_all(backend.root().join("docs").join("deep")).unwrap();
        std::fs::write(backend.root().join("docs").join("deep").join("readme.md"), b"hi").unwrap();

        let files = backend.list(&OpContext::new(), "docs/deep").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "readme.md");
        assert_eq!(files[0].path, "docs/deep/readme.md");
    }

    #[tokio::test]
    async fn test_list_not_found() {
        let (_dir, backend) = new_backend();
        let err = backend.list(&OpContext::new(), "nonexistent").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_on_file_is_not_found() {
        let (_dir, backend) = new_backend();
        std::fs::write(backend.root().join("a.txt"), b"aaa").unwrap();
        let err = backend.list(&OpContext::new(), "a.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_success() {
        let (_dir, backend) = new_backend();
        std::fs::write(backend.root().join("test.txt"), b"hello world").unwrap();
        assert_eq!(read_all(&backend, "test.txt").await.unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let (_dir, backend) = new_backend();
        let err = read_all(&backend, "missing.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_directory_is_not_found() {
        let (_dir, backend) = new_backend();
        std::fs::create_dir(backend.root().join("sub")).unwrap();
        let err = read_all(&backend, "sub").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_dir, backend) = new_backend();
        let ctx = OpContext::new();
        let data: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();

        backend
            .write(&ctx, "bin/blob.dat", stream_from_bytes(data.clone()))
            .await
            .unwrap();
        assert_eq!(read_all(&backend, "bin/blob.dat").await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_write_empty_content() {
        let (_dir, backend) = new_backend();
        backend
            .write(&OpContext::new(), "empty.txt", stream_from_bytes(Vec::new()))
            .await
            .unwrap();
        assert!(read_all(&backend, "empty.txt").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let (_dir, backend) = new_backend();
        backend
            .write(&OpContext::new(), "deep/nested/file.txt", stream_from_bytes("deep"))
            .await
            .unwrap();

        assert!(backend.root().join("deep").join("nested").is_dir());
        let data = std::fs::read(backend.root().join("deep").join("nested").join("file.txt")).unwrap();
        assert_eq!(data, b"deep");
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let (_dir, backend) = new_backend();
        let ctx = OpContext::new();
        backend.write(&ctx, "file.txt", stream_from_bytes("original")).await.unwrap();
        backend.write(&ctx, "file.txt", stream_from_bytes("new")).await.unwrap();
        assert_eq!(read_all(&backend, "file.txt").await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_write_multiple_chunks() {
        let (_dir, backend) = new_backend();
        let chunks: Vec<StorageResult<Bytes>> = vec![
            Ok(Bytes::from_static(b"one ")),
            Ok(Bytes::from_static(b"two ")),
            Ok(Bytes::from_static(b"three")),
        ];
        backend
            .write(&OpContext::new(), "chunks.txt", Box::pin(futures::stream::iter(chunks)))
            .await
            .unwrap();
        assert_eq!(read_all(&backend, "chunks.txt").await.unwrap(), b"one two three");
    }

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_failed_write_keeps_existing() {
        let (_dir, backend) = new_backend();
        std::fs::write(backend.root().join("keep.txt"), b"precious").unwrap();

        let chunks: Vec<StorageResult<Bytes>> = vec![
            Ok(Bytes::from_static(b"partial ")),
            Err(StorageError::unknown(io::Error::other("connection reset"))),
        ];
        let err = backend
            .write(&OpContext::new(), "keep.txt", Box::pin(futures::stream::iter(chunks)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);

        assert_eq!(std::fs::read(backend.root().join("keep.txt")).unwrap(), b"precious");
        assert_eq!(dir_names(backend.root()), vec!["keep.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_new_file_leaves_nothing() {
        let (_dir, backend) = new_backend();
        let chunks: Vec<StorageResult<Bytes>> =
            vec![Err(StorageError::unknown(io::Error::other("boom")))];
        backend
            .write(&OpContext::new(), "sub/new.txt", Box::pin(futures::stream::iter(chunks)))
            .await
            .unwrap_err();

        assert!(!backend.root().join("sub").join("new.txt").exists());
        assert!(dir_names(&backend.root().join("sub")).is_empty());
    }

    #[tokio::test]
    async fn test_write_onto_directory_is_unknown() {
        let (_dir, backend) = new_backend();
        std::fs::create_dir(backend.root().join("folder")).unwrap();
        let err = backend
            .write(&OpContext::new(), "folder", stream_from_bytes("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(backend.root().join("folder").is_dir());
        assert_eq!(dir_names(backend.root()), vec!["folder".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_written_file_mode_matches_plain_create() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, backend) = new_backend();
        backend
            .write(&OpContext::new(), "staged.txt", stream_from_bytes("x"))
            .await
            .unwrap();
        std::fs::write(backend.root().join("plain.txt"), b"x").unwrap();

        let mode = |name: &str| {
            std::fs::metadata(backend.root().join(name))
                .unwrap()
                .permissions()
                .mode()
        };
        assert_eq!(mode("staged.txt") & 0o444, mode("plain.txt") & 0o444);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_write_then_read_roundtrip(
            data in proptest::collection::vec(any::<u8>(), 0..8192),
            chunk in 1usize..1024,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let (_dir, backend) = new_backend();

            let chunks: Vec<StorageResult<Bytes>> = data
                .chunks(chunk)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            let read = rt
                .block_on(async {
                    backend
                        .write(&OpContext::new(), "blob.bin", Box::pin(futures::stream::iter(chunks)))
                        .await?;
                    read_all(&backend, "blob.bin").await
                })
                .unwrap();
            prop_assert_eq!(read, data);
        }
    }

    #[tokio::test]
    async fn test_write_traversal_denied() {
        let (dir, backend) = new_backend();
        let err = backend
            .write(&OpContext::new(), "../escape.txt", stream_from_bytes("x"))
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
        assert!(!dir.path().parent().unwrap().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn test_write_root_denied() {
        let (_dir, backend) = new_backend();
        let err = backend
            .write(&OpContext::new(), "/", stream_from_bytes("x"))
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn test_delete_then_stat() {
        let (_dir, backend) = new_backend();
        let ctx = OpContext::new();
        backend.write(&ctx, "doomed.txt", stream_from_bytes("bye")).await.unwrap();

        backend.delete(&ctx, "doomed.txt").await.unwrap();
        let err = backend.stat(&ctx, "doomed.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_not_found() {
        let (_dir, backend) = new_backend();
        let err = backend.delete(&OpContext::new(), "missing.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_empty_dir() {
        let (_dir, backend) = new_backend();
        std::fs::create_dir(backend.root().join("sub")).unwrap();
        backend.delete(&OpContext::new(), "sub").await.unwrap();
        assert!(!backend.root().join("sub").exists());
    }

    #[tokio::test]
    async fn test_delete_non_empty_dir_is_unknown() {
        let (_dir, backend) = new_backend();
        std::fs::create_dir(backend.root().join("sub")).unwrap();
        std::fs::write(backend.root().join("sub").join("f"), b"x").unwrap();
        let err = backend.delete(&OpContext::new(), "sub").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[tokio::test]
    async fn test_stat_file() {
        let (_dir, backend) = new_backend();
        let ctx = OpContext::new();
        backend.write(&ctx, "docs/five.txt", stream_from_bytes("12345")).await.unwrap();

        let entry = backend.stat(&ctx, "docs/five.txt").await.unwrap();
        assert_eq!(entry.size, 5);
        assert!(!entry.is_dir);
        assert_eq!(entry.name, "five.txt");
        assert_eq!(entry.path, "docs/five.txt");
    }

    #[tokio::test]
    async fn test_stat_root() {
        let (_dir, backend) = new_backend();
        let entry = backend.stat(&OpContext::new(), "").await.unwrap();
        assert!(entry.is_dir);
        assert_eq!(entry.path, ".");
    }

    #[tokio::test]
    async fn test_stat_not_found() {
        let (_dir, backend) = new_backend();
        let err = backend.stat(&OpContext::new(), "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cancelled_before_syscall() {
        let (_dir, backend) = new_backend();
        let ctx = OpContext::new();
        ctx.cancel();

        let err = backend
            .write(&ctx, "never.txt", stream_from_bytes("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(!backend.root().join("never.txt").exists());

        assert!(backend.stat(&ctx, "").await.is_err());
    }

    #[tokio::test]
    async fn test_independent_roots() {
        let (_a, first) = new_backend();
        let (_b, second) = new_backend();
        let ctx = OpContext::new();

        first.write(&ctx, "only-here.txt", stream_from_bytes("1")).await.unwrap();
        assert!(second.stat(&ctx, "only-here.txt").await.unwrap_err().is_not_found());
    }
}
