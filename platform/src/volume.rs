// Raw volume access
// Windows: raw volume handles via `\\.\X:` paths keyed by drive letter.
// Unix: block devices found through /proc/mounts, keyed by device path.

use fatscope_core::{AnalyzerError, SectorSource, VolumeId, VolumeScanner};
use log::debug;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Default sector size used until the boot sector reports the real value.
const DEFAULT_BYTES_PER_SECTOR: u32 = 512;

/// Blocking sector-addressed reader over an open volume handle.
pub struct RawVolume {
    file: File,
    bytes_per_sector: u32,
}

impl RawVolume {
    pub fn new(file: File) -> Self {
        Self {
            file,
            bytes_per_sector: DEFAULT_BYTES_PER_SECTOR,
        }
    }
}

impl SectorSource for RawVolume {
    fn bytes_per_sector(&self) -> u32 {
        self.bytes_per_sector
    }

    fn set_bytes_per_sector(&mut self, bytes: u32) {
        self.bytes_per_sector = bytes;
    }

    fn read_sectors(&mut self, start_sector: u64, count: u32) -> Result<Vec<u8>, AnalyzerError> {
        let offset = start_sector * self.bytes_per_sector as u64;
        let wanted = count as usize * self.bytes_per_sector as usize;
        self.file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; wanted];
        let mut filled = 0;
        while filled < wanted {
            let read = self.file.read(&mut buffer[filled..])?;
            if read == 0 {
                return Err(AnalyzerError::short_read(wanted, filled));
            }
            filled += read;
        }
        Ok(buffer)
    }
}

/// Discovers FAT volumes on the running system and opens them raw.
pub struct PlatformVolumeScanner;

#[async_trait::async_trait]
impl VolumeScanner for PlatformVolumeScanner {
    async fn enumerate_volumes(&self) -> Result<Vec<VolumeId>, AnalyzerError> {
        sys::enumerate_volumes()
    }

    async fn is_volume_available(&self, volume: &VolumeId) -> Result<bool, AnalyzerError> {
        Ok(sys::enumerate_volumes()?.contains(volume))
    }

    async fn open_volume(
        &self,
        volume: &VolumeId,
    ) -> Result<Box<dyn SectorSource>, AnalyzerError> {
        let raw_path = sys::raw_device_path(volume);
        debug!("opening raw volume {} at {}", volume, raw_path.display());
        let file = File::open(&raw_path).map_err(|source| {
            AnalyzerError::VolumeUnavailable(format!("{}: {}", raw_path.display(), source))
        })?;
        Ok(Box::new(RawVolume::new(file)))
    }

    fn volume_of_path(&self, path: &Path) -> Result<VolumeId, AnalyzerError> {
        sys::volume_of_path(path)
    }

    fn volume_root(&self, volume: &VolumeId) -> Result<PathBuf, AnalyzerError> {
        sys::volume_root(volume)
    }
}

#[cfg(windows)]
mod sys {
    use super::*;

    pub fn enumerate_volumes() -> Result<Vec<VolumeId>, AnalyzerError> {
        let mut volumes = Vec::new();
        for letter in b'A'..=b'Z' {
            let root = format!("{}:\\", letter as char);
            if Path::new(&root).exists() {
                volumes.push(VolumeId(format!("{}:", letter as char)));
            }
        }
        Ok(volumes)
    }

    pub fn raw_device_path(volume: &VolumeId) -> PathBuf {
        PathBuf::from(format!("\\\\.\\{}", volume.0))
    }

    pub fn volume_of_path(path: &Path) -> Result<VolumeId, AnalyzerError> {
        use std::path::{Component, Prefix};
        match path.components().next() {
            Some(Component::Prefix(prefix)) => match prefix.kind() {
                Prefix::Disk(letter) | Prefix::VerbatimDisk(letter) => {
                    Ok(VolumeId(format!("{}:", letter as char)))
                }
                _ => Err(AnalyzerError::VolumeUnavailable(format!(
                    "path has no drive letter: {}",
                    path.display()
                ))),
            },
            _ => Err(AnalyzerError::VolumeUnavailable(format!(
                "path is not absolute: {}",
                path.display()
            ))),
        }
    }

    pub fn volume_root(volume: &VolumeId) -> Result<PathBuf, AnalyzerError> {
        Ok(PathBuf::from(format!("{}\\", volume.0)))
    }
}

#[cfg(unix)]
mod sys {
    use super::*;
    use log::warn;

    /// One line of /proc/mounts: device, mount point, filesystem type.
    struct MountEntry {
        device: String,
        mount_point: PathBuf,
        fs_type: String,
    }

    fn mounts() -> Result<Vec<MountEntry>, AnalyzerError> {
        let table = std::fs::read_to_string("/proc/mounts")?;
        Ok(table
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                Some(MountEntry {
                    device: parts.next()?.to_string(),
                    mount_point: PathBuf::from(parts.next()?),
                    fs_type: parts.next()?.to_string(),
                })
            })
            .collect())
    }

    fn is_fat(fs_type: &str) -> bool {
        matches!(fs_type, "vfat" | "fat32" | "msdos")
    }

    pub fn enumerate_volumes() -> Result<Vec<VolumeId>, AnalyzerError> {
        Ok(mounts()?
            .into_iter()
            .filter(|entry| is_fat(&entry.fs_type))
            .map(|entry| VolumeId(entry.device))
            .collect())
    }

    pub fn raw_device_path(volume: &VolumeId) -> PathBuf {
        PathBuf::from(&volume.0)
    }

    pub fn volume_of_path(path: &Path) -> Result<VolumeId, AnalyzerError> {
        // Longest mount point that prefixes the path wins.
        let mut best: Option<MountEntry> = None;
        for entry in mounts()? {
            if path.starts_with(&entry.mount_point) {
                let longer = best
                    .as_ref()
                    .map(|current| {
                        entry.mount_point.as_os_str().len()
                            > current.mount_point.as_os_str().len()
                    })
                    .unwrap_or(true);
                if longer {
                    best = Some(entry);
                }
            }
        }
        let entry = best.ok_or_else(|| {
            AnalyzerError::VolumeUnavailable(format!("no mounted volume holds {}", path.display()))
        })?;
        if !is_fat(&entry.fs_type) {
            warn!(
                "{} is mounted as '{}', not a FAT filesystem",
                entry.device, entry.fs_type
            );
        }
        Ok(VolumeId(entry.device))
    }

    pub fn volume_root(volume: &VolumeId) -> Result<PathBuf, AnalyzerError> {
        mounts()?
            .into_iter()
            .find(|entry| entry.device == volume.0)
            .map(|entry| entry.mount_point)
            .ok_or_else(|| AnalyzerError::VolumeUnavailable(format!("{} is not mounted", volume)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn raw_volume_reads_are_sector_addressed() {
        let mut image = tempfile::NamedTempFile::new().unwrap();
        let mut data = vec![0u8; 1024];
        data[512] = 0xAB;
        image.write_all(&data).unwrap();

        let mut volume = RawVolume::new(File::open(image.path()).unwrap());
        let sector = volume.read_sectors(1, 1).unwrap();
        assert_eq!(sector.len(), 512);
        assert_eq!(sector[0], 0xAB);
    }

    #[test]
    fn short_read_is_io_failure() {
        let mut image = tempfile::NamedTempFile::new().unwrap();
        image.write_all(&[0u8; 600]).unwrap();

        let mut volume = RawVolume::new(File::open(image.path()).unwrap());
        let err = volume.read_sectors(0, 2).unwrap_err();
        assert!(matches!(err, AnalyzerError::IoFailure(_)));
    }

    #[test]
    fn sector_size_is_reconfigurable() {
        let mut image = tempfile::NamedTempFile::new().unwrap();
        image.write_all(&vec![7u8; 8192]).unwrap();

        let mut volume = RawVolume::new(File::open(image.path()).unwrap());
        assert_eq!(volume.bytes_per_sector(), 512);
        volume.set_bytes_per_sector(4096);
        let sector = volume.read_sectors(1, 1).unwrap();
        assert_eq!(sector.len(), 4096);
    }
}
