// FAT32 boot sector parsing
// Extracts volume geometry from the fixed offsets of sector 0 and derives
// the FAT and data region addresses everything downstream uses.

use fatscope_core::AnalyzerError;

// BPB field offsets (FAT32 variant).
const OFF_BYTES_PER_SECTOR: usize = 0x0B; // u16 LE
const OFF_SECTORS_PER_CLUSTER: usize = 0x0D; // u8
const OFF_RESERVED_SECTORS: usize = 0x0E; // u16 LE
const OFF_FAT_COUNT: usize = 0x10; // u8
const OFF_SECTORS_PER_FAT_32: usize = 0x24; // u32 LE
const OFF_ROOT_CLUSTER: usize = 0x2C; // u32 LE
const OFF_FS_TYPE_LABEL: usize = 0x52; // 8 ASCII bytes

const MIN_BOOT_SECTOR_LEN: usize = 512;

/// Volume geometry derived once per analysis run from the boot sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeGeometry {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub fat_count: u8,
    pub sectors_per_fat: u32,
    pub root_cluster: u32,
}

impl VolumeGeometry {
    /// Parse geometry out of the first sector of the volume.
    ///
    /// Only geometry consistency is validated; the "FAT32" type label is
    /// advisory and left to callers via [`fs_type_label`].
    pub fn parse(sector: &[u8]) -> Result<Self, AnalyzerError> {
        if sector.len() < MIN_BOOT_SECTOR_LEN {
            return Err(AnalyzerError::InvalidVolumeFormat(format!(
                "boot sector too short: {} bytes",
                sector.len()
            )));
        }

        let geometry = VolumeGeometry {
            bytes_per_sector: u16::from_le_bytes([
                sector[OFF_BYTES_PER_SECTOR],
                sector[OFF_BYTES_PER_SECTOR + 1],
            ]),
            sectors_per_cluster: sector[OFF_SECTORS_PER_CLUSTER],
            reserved_sectors: u16::from_le_bytes([
                sector[OFF_RESERVED_SECTORS],
                sector[OFF_RESERVED_SECTORS + 1],
            ]),
            fat_count: sector[OFF_FAT_COUNT],
            sectors_per_fat: u32::from_le_bytes([
                sector[OFF_SECTORS_PER_FAT_32],
                sector[OFF_SECTORS_PER_FAT_32 + 1],
                sector[OFF_SECTORS_PER_FAT_32 + 2],
                sector[OFF_SECTORS_PER_FAT_32 + 3],
            ]),
            root_cluster: u32::from_le_bytes([
                sector[OFF_ROOT_CLUSTER],
                sector[OFF_ROOT_CLUSTER + 1],
                sector[OFF_ROOT_CLUSTER + 2],
                sector[OFF_ROOT_CLUSTER + 3],
            ]),
        };

        geometry.validate()?;
        Ok(geometry)
    }

    fn validate(&self) -> Result<(), AnalyzerError> {
        if ![512, 1024, 2048, 4096].contains(&self.bytes_per_sector) {
            return Err(AnalyzerError::InvalidVolumeFormat(format!(
                "unsupported bytes per sector: {}",
                self.bytes_per_sector
            )));
        }
        if self.sectors_per_cluster == 0 {
            return Err(AnalyzerError::InvalidVolumeFormat(
                "sectors per cluster is zero".to_string(),
            ));
        }
        if self.sectors_per_fat == 0 {
            return Err(AnalyzerError::InvalidVolumeFormat(
                "sectors per FAT is zero".to_string(),
            ));
        }
        if self.fat_count == 0 {
            return Err(AnalyzerError::InvalidVolumeFormat(
                "FAT count is zero".to_string(),
            ));
        }
        if self.root_cluster < 2 {
            return Err(AnalyzerError::InvalidVolumeFormat(format!(
                "invalid root directory cluster: {}",
                self.root_cluster
            )));
        }
        Ok(())
    }

    /// First sector of the active FAT copy.
    pub fn first_fat_sector(&self) -> u64 {
        self.reserved_sectors as u64
    }

    /// First sector of the data region.
    pub fn first_data_sector(&self) -> u64 {
        self.reserved_sectors as u64 + self.fat_count as u64 * self.sectors_per_fat as u64
    }

    /// First sector of a data cluster. Valid for cluster numbers >= 2.
    pub fn first_sector_of_cluster(&self, cluster: u32) -> u64 {
        self.first_data_sector() + (cluster as u64 - 2) * self.sectors_per_cluster as u64
    }
}

/// The filesystem-type label at offset 0x52, trimmed. Advisory only: many
/// in-the-wild volumes carry inconsistent labels, so callers wanting strict
/// type detection must check this themselves.
pub fn fs_type_label(sector: &[u8]) -> Option<String> {
    let bytes = sector.get(OFF_FS_TYPE_LABEL..OFF_FS_TYPE_LABEL + 8)?;
    Some(String::from_utf8_lossy(bytes).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn build_boot_sector(
        bytes_per_sector: u16,
        sectors_per_cluster: u8,
        reserved_sectors: u16,
        fat_count: u8,
        sectors_per_fat: u32,
        root_cluster: u32,
    ) -> Vec<u8> {
        let mut sector = vec![0u8; 512];
        sector[OFF_BYTES_PER_SECTOR..OFF_BYTES_PER_SECTOR + 2]
            .copy_from_slice(&bytes_per_sector.to_le_bytes());
        sector[OFF_SECTORS_PER_CLUSTER] = sectors_per_cluster;
        sector[OFF_RESERVED_SECTORS..OFF_RESERVED_SECTORS + 2]
            .copy_from_slice(&reserved_sectors.to_le_bytes());
        sector[OFF_FAT_COUNT] = fat_count;
        sector[OFF_SECTORS_PER_FAT_32..OFF_SECTORS_PER_FAT_32 + 4]
            .copy_from_slice(&sectors_per_fat.to_le_bytes());
        sector[OFF_ROOT_CLUSTER..OFF_ROOT_CLUSTER + 4]
            .copy_from_slice(&root_cluster.to_le_bytes());
        sector[OFF_FS_TYPE_LABEL..OFF_FS_TYPE_LABEL + 8].copy_from_slice(b"FAT32   ");
        sector
    }

    #[test]
    fn parses_reference_geometry() {
        let sector = build_boot_sector(512, 8, 32, 2, 1000, 2);
        let geometry = VolumeGeometry::parse(&sector).unwrap();
        assert_eq!(geometry.bytes_per_sector, 512);
        assert_eq!(geometry.sectors_per_cluster, 8);
        assert_eq!(geometry.reserved_sectors, 32);
        assert_eq!(geometry.fat_count, 2);
        assert_eq!(geometry.sectors_per_fat, 1000);
        assert_eq!(geometry.root_cluster, 2);
    }

    #[test]
    fn derives_fat_and_data_sectors() {
        let sector = build_boot_sector(512, 8, 32, 2, 1000, 2);
        let geometry = VolumeGeometry::parse(&sector).unwrap();
        assert_eq!(geometry.first_fat_sector(), 32);
        assert_eq!(geometry.first_data_sector(), 32 + 2 * 1000);
        // Root cluster (2) starts exactly at the data region.
        assert_eq!(geometry.first_sector_of_cluster(2), geometry.first_data_sector());
        assert_eq!(
            geometry.first_sector_of_cluster(100),
            geometry.first_data_sector() + 98 * 8
        );
    }

    #[test]
    fn rejects_short_buffer() {
        let err = VolumeGeometry::parse(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidVolumeFormat(_)));
    }

    #[test]
    fn rejects_unsupported_sector_size() {
        let sector = build_boot_sector(520, 8, 32, 2, 1000, 2);
        assert!(VolumeGeometry::parse(&sector).is_err());
    }

    #[test]
    fn rejects_zero_sectors_per_cluster() {
        let sector = build_boot_sector(512, 0, 32, 2, 1000, 2);
        assert!(VolumeGeometry::parse(&sector).is_err());
    }

    #[test]
    fn rejects_zero_sectors_per_fat() {
        let sector = build_boot_sector(512, 8, 32, 2, 0, 2);
        assert!(VolumeGeometry::parse(&sector).is_err());
    }

    #[test]
    fn type_label_is_advisory() {
        let mut sector = build_boot_sector(512, 8, 32, 2, 1000, 2);
        assert_eq!(fs_type_label(&sector).as_deref(), Some("FAT32"));

        // A wrong label does not fail geometry parsing.
        sector[OFF_FS_TYPE_LABEL..OFF_FS_TYPE_LABEL + 8].copy_from_slice(b"NOFS    ");
        assert!(VolumeGeometry::parse(&sector).is_ok());
        assert_eq!(fs_type_label(&sector).as_deref(), Some("NOFS"));
    }
}
