use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::CollisionPolicy;
use crate::downloader::PackagedTrack;
use crate::errors::Result;
use crate::utils::ensure_dir_exists;

/// Where finished tracks go. Returns the file name actually used.
#[async_trait::async_trait]
pub trait Destination: Send + Sync {
    async fn write(&self, track: PackagedTrack) -> Result<String>;
}

/// Keeps finished tracks in memory for the caller to collect.
#[derive(Default)]
pub struct MemoryDestination {
    items: Mutex<Vec<PackagedTrack>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<PackagedTrack> {
        std::mem::take(&mut *self.items.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn names(&self) -> Vec<String> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|t| t.file_name.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Destination for MemoryDestination {
    async fn write(&self, track: PackagedTrack) -> Result<String> {
        let name = track.file_name.clone();
        self.items.lock().unwrap_or_else(|e| e.into_inner()).push(track);
        Ok(name)
    }
}

/// Writes tracks into a directory.
///
/// With `CollisionPolicy::Suffix`, a name already written through this
/// destination gets ` (2)`, ` (3)`, ... appended. Files left by earlier runs
/// are overwritten either way.
pub struct FolderDestination {
    root: PathBuf,
    policy: CollisionPolicy,
    written: tokio::sync::Mutex<HashSet<String>>,
}

impl FolderDestination {
    pub fn new(root: impl Into<PathBuf>, policy: CollisionPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
            written: tokio::sync::Mutex::new(HashSet::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn with_suffix(file_name: &str, n: usize) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", file_name, n),
    }
}

#[async_trait::async_trait]
impl Destination for FolderDestination {
    async fn write(&self, track: PackagedTrack) -> Result<String> {
        let mut written = self.written.lock().await;
        ensure_dir_exists(&self.root).await?;

        let mut name = track.file_name.clone();
        if self.policy == CollisionPolicy::Suffix {
            let mut n = 2;
            while written.contains(&name.to_lowercase()) {
                name = with_suffix(&track.file_name, n);
                n += 1;
            }
        } else if written.contains(&name.to_lowercase()) {
            log::warn!("⚠️ [SAVE] Overwriting {} written earlier in this batch", name);
        }

        let path = self.root.join(&name);
        tokio::fs::write(&path, &track.bytes).await?;
        written.insert(name.to_lowercase());

        log::info!("💾 [SAVE] Wrote {} ({} bytes)", path.display(), track.bytes.len());
        Ok(name)
    }
}
