// Progress and cancellation plumbing
// Progress is reported as discrete phase transitions; only the FAT-region
// read emits finer-grained chunk events. Cancellation is cooperative and
// checked between phases and between read chunks, never inside one.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One marker per pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisPhase {
    CheckingVolume,
    ReadingBootSector,
    LocatingAnalysisRoot,
    BuildingFileTree,
    ResolvingDirectoryEntries,
    ReadingFat,
    BuildingClusterChains,
    FormattingReport,
}

impl AnalysisPhase {
    pub fn describe(&self) -> &'static str {
        match self {
            AnalysisPhase::CheckingVolume => "checking volume availability",
            AnalysisPhase::ReadingBootSector => "reading boot sector",
            AnalysisPhase::LocatingAnalysisRoot => "locating analysis root on disk",
            AnalysisPhase::BuildingFileTree => "mirroring host directory tree",
            AnalysisPhase::ResolvingDirectoryEntries => "resolving directory entries",
            AnalysisPhase::ReadingFat => "reading FAT region",
            AnalysisPhase::BuildingClusterChains => "building cluster chains",
            AnalysisPhase::FormattingReport => "formatting report",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressEvent {
    Phase(AnalysisPhase),
    /// Chunk-level progress inside the FAT-region read, in sectors.
    FatChunk { sectors_read: u32, sectors_total: u32 },
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op sink for callers that do not care about progress.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Cooperative cancellation flag shared between the caller and a running
/// analysis. A cancelled analysis aborts with `AnalyzerError::Cancelled`
/// and its partially resolved tree must be discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Error out if cancellation was requested.
    pub fn check(&self) -> Result<(), crate::AnalyzerError> {
        if self.is_cancelled() {
            Err(crate::AnalyzerError::Cancelled)
        } else {
            Ok(())
        }
    }
}
