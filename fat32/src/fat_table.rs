// FAT region decoding
// The active (first) FAT copy is read whole into memory and addressed as
// 32-bit little-endian entries; the top 4 bits of each entry are reserved
// and always masked off.

use crate::boot_sector::VolumeGeometry;
use fatscope_core::progress::{ProgressEvent, ProgressSink};
use fatscope_core::{AnalyzerError, CancelToken, SectorSource};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Reserved top bits of a FAT32 entry.
pub const ENTRY_MASK: u32 = 0x0FFF_FFFF;
pub const BAD_CLUSTER: u32 = 0x0FFF_FFF7;
pub const END_OF_CHAIN_MIN: u32 = 0x0FFF_FFF8;

/// Sectors read per chunk while loading the FAT region. Cancellation is
/// checked between chunks; a single chunk read is not interruptible.
const FAT_READ_CHUNK_SECTORS: u32 = 128;

/// One 32-bit value from the FAT region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatEntry {
    raw: u32,
}

/// Mutually exclusive classification of a FAT entry, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatEntryKind {
    Free,
    Bad,
    EndOfChain,
    /// The masked value is the next cluster number in the chain.
    Allocated,
}

impl FatEntry {
    pub fn new(raw: u32) -> Self {
        Self { raw }
    }

    /// Effective value with the reserved top bits masked off.
    pub fn value(&self) -> u32 {
        self.raw & ENTRY_MASK
    }

    pub fn kind(&self) -> FatEntryKind {
        let value = self.value();
        if value == 0 {
            FatEntryKind::Free
        } else if value == BAD_CLUSTER {
            FatEntryKind::Bad
        } else if value >= END_OF_CHAIN_MIN {
            FatEntryKind::EndOfChain
        } else {
            FatEntryKind::Allocated
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind(), FatEntryKind::Bad | FatEntryKind::EndOfChain)
    }

    /// Masked value as 8-digit zero-padded hex, e.g. "0x00000065".
    pub fn to_hex(&self) -> String {
        format!("0x{:08X}", self.value())
    }

    /// Human-readable classification used in report rows.
    pub fn status(&self) -> String {
        match self.kind() {
            FatEntryKind::Bad => "Bad Cluster".to_string(),
            FatEntryKind::EndOfChain => "Last Cluster in chain".to_string(),
            _ => self.value().to_string(),
        }
    }
}

/// In-memory copy of the active FAT region.
#[derive(Debug, Clone)]
pub struct FatTable {
    data: Vec<u8>,
}

impl FatTable {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Number of whole 32-bit entries the buffer holds.
    pub fn entry_count(&self) -> u32 {
        (self.data.len() / 4) as u32
    }

    /// Entry for `cluster`, or `None` if `cluster * 4 + 4` exceeds the
    /// buffer (the truncated-FAT case).
    pub fn entry(&self, cluster: u32) -> Option<FatEntry> {
        let offset = cluster as usize * 4;
        let bytes = self.data.get(offset..offset + 4)?;
        Some(FatEntry::new(u32::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ])))
    }
}

/// Read the first FAT copy into memory, in chunks, with a cancellation
/// check and a progress event between chunks.
pub fn read_fat_table(
    source: &mut dyn SectorSource,
    geometry: &VolumeGeometry,
    cancel: &CancelToken,
    progress: &dyn ProgressSink,
) -> Result<FatTable, AnalyzerError> {
    let first_sector = geometry.first_fat_sector();
    let total = geometry.sectors_per_fat;
    let bytes_per_sector = geometry.bytes_per_sector as usize;

    debug!(
        "reading FAT region: {} sectors starting at sector {}",
        total, first_sector
    );

    let mut data = Vec::with_capacity(total as usize * bytes_per_sector);
    let mut sectors_read = 0u32;

    while sectors_read < total {
        cancel.check()?;
        let count = FAT_READ_CHUNK_SECTORS.min(total - sectors_read);
        let chunk = source.read_sectors(first_sector + sectors_read as u64, count)?;
        let expected = count as usize * bytes_per_sector;
        if chunk.len() < expected {
            return Err(AnalyzerError::short_read(expected, chunk.len()));
        }
        data.extend_from_slice(&chunk);
        sectors_read += count;
        trace!("FAT chunk read: {}/{} sectors", sectors_read, total);
        progress.report(ProgressEvent::FatChunk {
            sectors_read,
            sectors_total: total,
        });
    }

    Ok(FatTable::new(data))
}
