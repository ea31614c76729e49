#![allow(clippy::module_name_repetitions)]

//! Filesystem sync engine
//!
//! Three primitives move built module output around: `remove`, `copy` and
//! `replace`. All of them walk arbitrarily nested trees. A failure part way
//! through leaves whatever was already written; re-running `copy` or
//! `replace` against an unchanged source converges on the same result.

use futures::future::BoxFuture;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use wsb_errors::{Error, SyncError};
use wsb_events::{EventEmitter, SyncEvent};

use crate::core::PlatformContext;

/// Result type for filesystem operations
pub type Result<T> = std::result::Result<T, Error>;

/// Counters for one sync operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub files_copied: usize,
    pub dirs_created: usize,
    pub entries_removed: usize,
}

impl std::ops::AddAssign for SyncStats {
    fn add_assign(&mut self, rhs: Self) {
        self.files_copied += rhs.files_copied;
        self.dirs_created += rhs.dirs_created;
        self.entries_removed += rhs.entries_removed;
    }
}

/// Whether a path exists (following symlinks)
#[must_use]
pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Whether a path is an existing directory
#[must_use]
pub fn is_dir(path: &Path) -> bool {
    path.is_dir()
}

/// Whether a path is an existing regular file
#[must_use]
pub fn is_file(path: &Path) -> bool {
    path.is_file()
}

/// Recursive remove / copy / replace with event emission
#[derive(Debug, Clone, Default)]
pub struct SyncEngine {
    ctx: PlatformContext,
    remove_delay: Duration,
}

impl SyncEngine {
    /// `remove_delay` is waited before each directory's final `rmdir`.
    #[must_use]
    pub fn new(ctx: PlatformContext, remove_delay: Duration) -> Self {
        Self { ctx, remove_delay }
    }

    /// Delete a file, symlink or directory tree
    ///
    /// Symlinks are unlinked, never followed. A path that does not exist is
    /// already removed.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::RemoveFailed` if any deletion is denied.
    pub async fn remove(&self, path: &Path) -> Result<SyncStats> {
        self.remove_entry(path, false).await
    }

    /// Copy a file or directory tree to `dst`
    ///
    /// Files are created or truncated. Directories are created when absent.
    /// Nothing that exists only at `dst` is touched.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::SourceMissing` if `src` does not exist, or a copy /
    /// create error for the first entry that fails.
    pub async fn copy(&self, src: &Path, dst: &Path) -> Result<SyncStats> {
        self.copy_entry(src, dst, false).await
    }

    /// Make `dst` a mirror of `src`
    ///
    /// Like [`SyncEngine::copy`], but every directory entry at `dst` with no
    /// counterpart in `src` is removed afterwards.
    ///
    /// # Errors
    ///
    /// Same as [`SyncEngine::copy`] and [`SyncEngine::remove`].
    pub async fn replace(&self, src: &Path, dst: &Path) -> Result<SyncStats> {
        let stats = self.copy_entry(src, dst, true).await?;
        self.ctx.emit_sync(SyncEvent::Replaced {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            copied: stats.files_copied,
            removed: stats.entries_removed,
        });
        Ok(stats)
    }

    fn remove_entry<'a>(&'a self, path: &'a Path, stale: bool) -> BoxFuture<'a, Result<SyncStats>> {
        Box::pin(async move {
            let metadata = match fs::symlink_metadata(path).await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Ok(SyncStats::default())
                }
                Err(e) => return Err(SyncError::remove(&e, path).into()),
            };

            let mut stats = SyncStats::default();
            if metadata.is_dir() {
                let mut entries = fs::read_dir(path)
                    .await
                    .map_err(|e| SyncError::remove(&e, path))?;
                while let Some(entry) = entries
                    .next_entry()
                    .await
                    .map_err(|e| SyncError::remove(&e, path))?
                {
                    stats += self.remove_entry(&entry.path(), false).await?;
                }
                if !self.remove_delay.is_zero() {
                    tokio::time::sleep(self.remove_delay).await;
                }
                fs::remove_dir(path)
                    .await
                    .map_err(|e| SyncError::remove(&e, path))?;
            } else {
                fs::remove_file(path)
                    .await
                    .map_err(|e| SyncError::remove(&e, path))?;
            }

            stats.entries_removed += 1;
            self.ctx.emit_sync(SyncEvent::EntryRemoved {
                path: path.to_path_buf(),
                stale,
            });
            Ok::<_, Error>(stats)
        })
    }

    fn copy_entry<'a>(
        &'a self,
        src: &'a Path,
        dst: &'a Path,
        mirror: bool,
    ) -> BoxFuture<'a, Result<SyncStats>> {
        Box::pin(async move {
            let metadata = fs::metadata(src).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SyncError::SourceMissing {
                        path: src.display().to_string(),
                    }
                } else {
                    SyncError::copy(&e, src, dst)
                }
            })?;

            let mut stats = SyncStats::default();

            // A mirror replaces an entry of the other kind outright.
            if mirror {
                if let Ok(existing) = fs::symlink_metadata(dst).await {
                    if existing.is_dir() != metadata.is_dir() || existing.file_type().is_symlink()
                    {
                        stats += self.remove_entry(dst, true).await?;
                    }
                }
            }

            if metadata.is_file() {
                if let Some(parent) = dst.parent().filter(|p| !is_dir(p)) {
                    fs::create_dir_all(parent)
                        .await
                        .map_err(|e| SyncError::create_dir(&e, parent))?;
                    stats.dirs_created += 1;
                }
                fs::copy(src, dst)
                    .await
                    .map_err(|e| SyncError::copy(&e, src, dst))?;
                stats.files_copied += 1;
                self.ctx.emit_sync(SyncEvent::FileCopied {
                    src: src.to_path_buf(),
                    dst: dst.to_path_buf(),
                });
                return Ok(stats);
            }

            if !is_dir(dst) {
                fs::create_dir_all(dst)
                    .await
                    .map_err(|e| SyncError::create_dir(&e, dst))?;
                stats.dirs_created += 1;
            }

            let mut names = Vec::new();
            let mut entries = fs::read_dir(src)
                .await
                .map_err(|e| SyncError::copy(&e, src, dst))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| SyncError::copy(&e, src, dst))?
            {
                let name = entry.file_name();
                stats += self
                    .copy_entry(&entry.path(), &dst.join(&name), mirror)
                    .await?;
                names.push(name);
            }

            if mirror {
                let mut stale = Vec::new();
                let mut existing = fs::read_dir(dst)
                    .await
                    .map_err(|e| SyncError::remove(&e, dst))?;
                while let Some(entry) = existing
                    .next_entry()
                    .await
                    .map_err(|e| SyncError::remove(&e, dst))?
                {
                    if !names.contains(&entry.file_name()) {
                        stale.push(entry.path());
                    }
                }
                for path in stale {
                    stats += self.remove_entry(&path, true).await?;
                }
            }

            Ok::<_, Error>(stats)
        })
    }
}
