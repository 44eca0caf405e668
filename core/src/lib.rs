pub mod error;
pub mod host;
pub mod progress;
pub mod report;
pub mod volume;

pub use error::AnalyzerError;
pub use host::HostEnumerator;
pub use progress::{AnalysisPhase, CancelToken, ProgressEvent, ProgressSink};
pub use report::ClusterRow;
pub use volume::{SectorSource, VolumeId, VolumeScanner};
