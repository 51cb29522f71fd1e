pub mod destination;
pub mod fetcher;
pub mod manager;
pub mod pipeline;

pub use destination::{Destination, FolderDestination, MemoryDestination};
pub use fetcher::MediaFetcher;
pub use manager::{BatchOrchestrator, BatchResult, CancelHandle};
pub use pipeline::{TrackOutcome, TrackPipeline};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::api::TrackKey;
use crate::metadata::TagBranch;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Fetching,
    Tagging,
    Saving,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    /// Stages only move forward; `Failed` is reachable from any non-terminal stage.
    pub fn can_advance_to(&self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Stage::Failed || next >= *self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub stage: Stage,
    /// Only set while fetching.
    pub percent: Option<u8>,
    pub note: Option<String>,
}

impl Progress {
    pub fn fetching(percent: u8) -> Self {
        Self {
            stage: Stage::Fetching,
            percent: Some(percent.min(100)),
            note: None,
        }
    }

    pub fn stage(stage: Stage) -> Self {
        Self {
            stage,
            percent: None,
            note: None,
        }
    }

    pub fn done(file_name: &str) -> Self {
        Self {
            stage: Stage::Done,
            percent: None,
            note: Some(file_name.to_string()),
        }
    }

    pub fn failed(note: impl Into<String>) -> Self {
        Self {
            stage: Stage::Failed,
            percent: None,
            note: Some(note.into()),
        }
    }
}

/// Receives per-track transitions and per-batch counts.
pub trait ProgressSink: Send + Sync {
    fn track_progress(&self, key: &TrackKey, progress: &Progress);

    fn batch_progress(&self, _done: usize, _total: usize) {}
}

/// Latest progress per track, plus the current batch counter.
#[derive(Default)]
pub struct ProgressBoard {
    tracks: Mutex<HashMap<TrackKey, Progress>>,
    batch: Mutex<(usize, usize)>,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &TrackKey) -> Option<Progress> {
        let tracks = self.tracks.lock().unwrap_or_else(|e| e.into_inner());
        tracks.get(key).cloned()
    }

    pub fn snapshot(&self) -> Vec<(TrackKey, Progress)> {
        let tracks = self.tracks.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<_> = tracks.iter().map(|(k, p)| (k.clone(), p.clone())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn batch(&self) -> (usize, usize) {
        *self.batch.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProgressSink for ProgressBoard {
    fn track_progress(&self, key: &TrackKey, progress: &Progress) {
        let mut tracks = self.tracks.lock().unwrap_or_else(|e| e.into_inner());
        match tracks.get(key) {
            // a finished track can be queued again in a later batch
            Some(current) if !current.stage.is_terminal() && !current.stage.can_advance_to(progress.stage) => {
                log::debug!(
                    "Ignoring backwards progress for {}: {:?} -> {:?}",
                    key,
                    current.stage,
                    progress.stage
                );
            }
            _ => {
                tracks.insert(key.clone(), progress.clone());
            }
        }
    }

    fn batch_progress(&self, done: usize, total: usize) {
        *self.batch.lock().unwrap_or_else(|e| e.into_inner()) = (done, total);
    }
}

/// A tagged file ready to hand to a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedTrack {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub branch: TagBranch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_only_move_forward() {
        assert!(Stage::Fetching.can_advance_to(Stage::Fetching));
        assert!(Stage::Fetching.can_advance_to(Stage::Tagging));
        assert!(Stage::Saving.can_advance_to(Stage::Failed));
        assert!(!Stage::Saving.can_advance_to(Stage::Fetching));
        assert!(!Stage::Done.can_advance_to(Stage::Failed));
        assert!(!Stage::Failed.can_advance_to(Stage::Done));
    }

    #[test]
    fn board_keeps_latest_progress_per_key() {
        let board = ProgressBoard::new();
        let a = TrackKey::new("netease", "1");
        let b = TrackKey::new("kuwo", "1");

        board.track_progress(&a, &Progress::fetching(40));
        board.track_progress(&b, &Progress::stage(Stage::Tagging));
        board.track_progress(&a, &Progress::stage(Stage::Saving));
        board.track_progress(&a, &Progress::fetching(90));

        assert_eq!(board.get(&a).unwrap().stage, Stage::Saving);
        assert_eq!(board.get(&b).unwrap().stage, Stage::Tagging);
        assert_eq!(board.snapshot().len(), 2);

        board.track_progress(&a, &Progress::done("x.mp3"));
        board.track_progress(&a, &Progress::fetching(0));
        assert_eq!(board.get(&a).unwrap().stage, Stage::Fetching);

        board.batch_progress(1, 3);
        assert_eq!(board.batch(), (1, 3));
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(Progress::fetching(250).percent, Some(100));
    }
}
