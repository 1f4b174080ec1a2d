//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages and recognizes cells.
//!
//! # Example
//!
//! ```rust
//! use pdf2xlsx::{ExtractionConfig, ExtractionProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct StageLogger;
//!
//! impl ExtractionProgressCallback for StageLogger {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{} done in {}ms", stage.label(), elapsed_ms);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(StageLogger) as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Render the last page to `last_page_image.png`.
    Rasterize,
    /// Find line structures and candidate regions.
    DetectGrid,
    /// OCR every candidate region.
    RecognizeText,
    /// Bucket, merge and write the workbook.
    BuildSheet,
    /// Render the fixed-size preview table.
    RenderPreview,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Rasterize,
        Stage::DetectGrid,
        Stage::RecognizeText,
        Stage::BuildSheet,
        Stage::RenderPreview,
    ];

    /// Short human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Rasterize => "Rasterizing last page",
            Stage::DetectGrid => "Detecting grid",
            Stage::RecognizeText => "Recognizing cell text",
            Stage::BuildSheet => "Building workbook",
            Stage::RenderPreview => "Rendering preview",
        }
    }
}

/// Called by the pipeline as it runs.
///
/// Implementations must be `Send + Sync`: stage work runs on tokio's
/// blocking pool, so events may arrive from a thread other than the caller's.
/// All methods have default no-op implementations.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called just before a stage starts.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finished successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called after each candidate region has been recognized.
    ///
    /// # Arguments
    /// * `index`: 0-based position in extractor order
    /// * `total`: number of candidate regions
    /// * `text` : the trimmed recognized text (may be empty)
    fn on_cell_recognized(&self, index: usize, total: usize, text: &str) {
        let _ = (index, total, text);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        started: Mutex<Vec<Stage>>,
        completed: AtomicUsize,
        cells: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_stage_start(&self, stage: Stage) {
            self.started.lock().unwrap().push(stage);
        }

        fn on_stage_complete(&self, _stage: Stage, _elapsed_ms: u64) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_cell_recognized(&self, _index: usize, _total: usize, _text: &str) {
            self.cells.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Rasterize);
        cb.on_cell_recognized(0, 3, "");
        cb.on_stage_complete(Stage::Rasterize, 12);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        for stage in Stage::ALL {
            tracker.on_stage_start(stage);
            tracker.on_stage_complete(stage, 1);
        }
        tracker.on_cell_recognized(0, 2, "Total");
        tracker.on_cell_recognized(1, 2, "");

        assert_eq!(*tracker.started.lock().unwrap(), Stage::ALL.to_vec());
        assert_eq!(tracker.completed.load(Ordering::SeqCst), 5);
        assert_eq!(tracker.cells.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stage_labels_are_distinct() {
        let mut labels: Vec<_> = Stage::ALL.iter().map(|s| s.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Stage::ALL.len());
    }
}
