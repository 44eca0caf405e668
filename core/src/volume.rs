// Raw volume access seam
// The analyzer only ever needs sector-addressed reads; everything
// OS-specific lives behind these traits in the platform crate.

use crate::AnalyzerError;
use serde::{Deserialize, Serialize};

/// Identifies a drive/volume: a drive letter on Windows ("E:"),
/// a block device path on Unix ("/dev/sdb1").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeId(pub String);

impl std::fmt::Display for VolumeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A handle capable of reading fixed-size sectors at arbitrary sector
/// offsets. Reads are blocking; a single sector read is not interruptible.
pub trait SectorSource: Send {
    /// Sector size used for addressing. Starts at 512 until the boot
    /// sector reports the real value.
    fn bytes_per_sector(&self) -> u32;

    /// Re-align sector addressing after the boot sector has been parsed.
    fn set_bytes_per_sector(&mut self, bytes: u32);

    /// Read `count` whole sectors starting at `start_sector`. Returns
    /// exactly `count * bytes_per_sector()` bytes or fails with
    /// `IoFailure`.
    fn read_sectors(&mut self, start_sector: u64, count: u32) -> Result<Vec<u8>, AnalyzerError>;
}

/// Discovers and opens raw volumes.
#[async_trait::async_trait]
pub trait VolumeScanner: Send + Sync {
    async fn enumerate_volumes(&self) -> Result<Vec<VolumeId>, AnalyzerError>;

    async fn is_volume_available(&self, volume: &VolumeId) -> Result<bool, AnalyzerError>;

    async fn open_volume(&self, volume: &VolumeId)
        -> Result<Box<dyn SectorSource>, AnalyzerError>;

    /// Volume holding the given absolute host path (its first path
    /// component on Windows, its mount point on Unix).
    fn volume_of_path(&self, path: &std::path::Path) -> Result<VolumeId, AnalyzerError>;

    /// Host path of the volume's root directory, e.g. `E:\` or `/mnt/usb`.
    fn volume_root(&self, volume: &VolumeId) -> Result<std::path::PathBuf, AnalyzerError>;
}
