//! Scoped ownership of a task's temporary download path.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// A temporary download target removed when the task finishes
///
/// Removal also sweeps yt-dlp leftovers that share the file stem
/// (`{stem}.mp4.part`, `{stem}.f137.mp4`, ...). Call [`TempFile::remove`] on
/// every exit path; `Drop` is a synchronous fallback for panics and aborted
/// tasks.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    removed: bool,
}

impl TempFile {
    /// Take ownership of `path` (which need not exist yet)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            removed: false,
        }
    }

    /// The owned path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file and its leftovers. Safe to call more than once.
    pub async fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;

        remove_quietly(&self.path).await;

        let (Some(dir), Some(prefix)) = (self.path.parent(), leftover_prefix(&self.path)) else {
            return;
        };
        let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if is_leftover(&entry.file_name(), &prefix) {
                remove_quietly(&entry.path()).await;
            }
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }

        let _ = std::fs::remove_file(&self.path);
        let (Some(dir), Some(prefix)) = (self.path.parent(), leftover_prefix(&self.path)) else {
            return;
        };
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                if is_leftover(&entry.file_name(), &prefix) {
                    let _ = std::fs::remove_file(entry.path());
                }
            }
        }
        tracing::debug!(path = ?self.path, "Temporary file removed on drop");
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(?path, "Removed temporary file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(?path, error = %e, "Failed to remove temporary file"),
    }
}

fn leftover_prefix(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(|stem| format!("{stem}."))
}

fn is_leftover(name: &OsStr, prefix: &str) -> bool {
    name.to_str().is_some_and(|name| name.starts_with(prefix))
}
