use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::api::{Track, TrackKey};
use crate::downloader::pipeline::{TrackOutcome, TrackPipeline};
use crate::downloader::{Destination, ProgressSink};

/// Stops a running batch before its next item starts.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub requested: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Names the destination stored, in submission order.
    pub written: Vec<String>,
    /// Last failure note per failed track, in submission order.
    pub failures: Vec<(TrackKey, String)>,
    pub cancelled: bool,
}

impl BatchResult {
    fn record(&mut self, key: TrackKey, outcome: TrackOutcome) {
        self.attempted += 1;
        match outcome {
            TrackOutcome::Done(name) => {
                self.succeeded += 1;
                self.written.push(name);
            }
            TrackOutcome::Failed(note) => {
                self.failed += 1;
                match self.failures.iter_mut().find(|(k, _)| *k == key) {
                    Some(entry) => entry.1 = note,
                    None => self.failures.push((key, note)),
                }
            }
        }
    }
}

/// Runs tracks one after another through a single pipeline. One track's
/// failure never stops the others.
pub struct BatchOrchestrator {
    pipeline: TrackPipeline,
    cancel: CancelHandle,
}

impl BatchOrchestrator {
    pub fn new(pipeline: TrackPipeline) -> Self {
        Self {
            pipeline,
            cancel: CancelHandle::new(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub async fn run(&self, tracks: &[Track], destination: &dyn Destination, sink: &dyn ProgressSink) -> BatchResult {
        let total = tracks.len();
        let mut result = BatchResult {
            requested: total,
            ..BatchResult::default()
        };

        log::info!("📦 [BATCH] Starting batch of {} tracks at {}", total, self.pipeline.quality());

        for (index, track) in tracks.iter().enumerate() {
            if self.cancel.is_cancelled() {
                log::warn!("⏹️ [BATCH] Cancelled after {} of {} tracks", index, total);
                result.cancelled = true;
                break;
            }

            log::info!("📦 [BATCH] [{}/{}] {}", index + 1, total, track.key());
            let outcome = self.pipeline.run(track, destination, sink).await;
            result.record(track.key(), outcome);
            sink.batch_progress(index + 1, total);
        }

        log::info!(
            "📦 [BATCH] Finished: {} succeeded, {} failed, {} not attempted",
            result.succeeded,
            result.failed,
            result.requested - result.attempted
        );
        result
    }
}
