// Directory-entry resolution
// Scans raw 32-byte directory records to find the entry belonging to each
// mirrored node, reconstructing long filenames from their chained
// fragments, and records the entry's first cluster.

use crate::boot_sector::VolumeGeometry;
use crate::tree::{FileTree, NodeKind, ROOT};
use fatscope_core::{AnalyzerError, SectorSource};
use log::{debug, trace};

pub const RECORD_SIZE: usize = 32;

const ENTRY_FREE: u8 = 0x00;
const ENTRY_DELETED: u8 = 0xE5;
const ATTR_LONG_NAME: u8 = 0x0F;
const LFN_ORDINAL_MASK: u8 = 0x1F;

// Short-entry field offsets within a 32-byte record.
const OFF_NAME: usize = 0;
const OFF_EXTENSION: usize = 8;
const OFF_ATTRIBUTES: usize = 11;
const OFF_CLUSTER_HIGH: usize = 20;
const OFF_CLUSTER_LOW: usize = 26;

/// How candidate names are compared against the node being resolved.
///
/// The historical behavior of this tool was substring containment, which
/// can misidentify a file whose name is a substring of another's. Exact
/// comparison is the default; `Substring` is an explicit opt-in for
/// compatibility with old runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Exact,
    Substring,
}

/// What the scan is looking for: the node's name plus, for files, its
/// short extension.
#[derive(Debug, Clone)]
pub struct EntryTarget {
    pub name: String,
    pub extension: Option<String>,
}

impl EntryTarget {
    pub fn directory(name: &str) -> Self {
        Self {
            name: name.to_string(),
            extension: None,
        }
    }

    pub fn file(name: &str, extension: &str) -> Self {
        Self {
            name: name.to_string(),
            extension: Some(extension.to_string()),
        }
    }

    /// Full name a long-filename candidate must carry.
    fn long_name(&self) -> String {
        match self.extension.as_deref() {
            Some(ext) if !ext.is_empty() => format!("{}.{}", self.name, ext),
            _ => self.name.clone(),
        }
    }

    fn matches_long(&self, candidate: &str, mode: MatchMode) -> bool {
        let candidate = candidate.to_lowercase();
        let wanted = self.long_name().to_lowercase();
        match mode {
            MatchMode::Exact => candidate == wanted,
            MatchMode::Substring => candidate.contains(&self.name.to_lowercase()),
        }
    }

    fn matches_short(&self, name: &str, extension: &str, mode: MatchMode) -> bool {
        let name = name.to_lowercase();
        let wanted_name = self.name.to_lowercase();
        let name_ok = match mode {
            MatchMode::Exact => name == wanted_name,
            MatchMode::Substring => name.contains(&wanted_name),
        };
        if !name_ok {
            return false;
        }
        match self.extension.as_deref() {
            None => true,
            Some(wanted_ext) => {
                let extension = extension.to_lowercase();
                let wanted_ext = wanted_ext.to_lowercase();
                match mode {
                    MatchMode::Exact => extension == wanted_ext,
                    MatchMode::Substring => extension.contains(&wanted_ext),
                }
            }
        }
    }
}

/// One long-filename record: sequence ordinal (low 5 bits of byte 0) and
/// its up-to-13 UTF-16 code units.
#[derive(Debug, Clone)]
struct LfnFragment {
    ordinal: u8,
    units: Vec<u16>,
}

/// One decoded 32-byte directory record.
#[derive(Debug)]
enum DirRecord {
    /// First byte 0x00: unused slot. Not end-of-directory, since
    /// directories can have gaps.
    Empty,
    /// First byte 0xE5: deleted entry.
    Deleted,
    Lfn(LfnFragment),
    Short(ShortEntry),
}

#[derive(Debug)]
struct ShortEntry {
    name: String,
    extension: String,
    first_cluster: u32,
}

fn parse_record(record: &[u8]) -> DirRecord {
    debug_assert_eq!(record.len(), RECORD_SIZE);
    match record[0] {
        ENTRY_FREE => DirRecord::Empty,
        ENTRY_DELETED => DirRecord::Deleted,
        _ if record[OFF_ATTRIBUTES] == ATTR_LONG_NAME => DirRecord::Lfn(LfnFragment {
            ordinal: record[0] & LFN_ORDINAL_MASK,
            units: lfn_units(record),
        }),
        _ => {
            let low = u16::from_le_bytes([record[OFF_CLUSTER_LOW], record[OFF_CLUSTER_LOW + 1]]);
            let high =
                u16::from_le_bytes([record[OFF_CLUSTER_HIGH], record[OFF_CLUSTER_HIGH + 1]]);
            DirRecord::Short(ShortEntry {
                name: trimmed_ascii(&record[OFF_NAME..OFF_NAME + 8]),
                extension: trimmed_ascii(&record[OFF_EXTENSION..OFF_EXTENSION + 3]),
                first_cluster: (high as u32) << 16 | low as u32,
            })
        }
    }
}

/// The three name segments of an LFN record: UTF-16 code units,
/// zero-terminated, 0xFFFF-padded.
fn lfn_units(record: &[u8]) -> Vec<u16> {
    let mut units = Vec::with_capacity(13);
    for range in [1..11, 14..26, 28..32] {
        let segment = &record[range];
        for pair in segment.chunks_exact(2) {
            let unit = u16::from_le_bytes([pair[0], pair[1]]);
            if unit == 0x0000 {
                return units;
            }
            if unit == 0xFFFF {
                continue;
            }
            units.push(unit);
        }
    }
    units
}

fn trimmed_ascii(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end_matches(' ').to_string()
}

/// Fragments seen since the last short entry. On-disk fragment order is
/// unspecified, so they are sorted by ordinal before concatenation.
#[derive(Default)]
struct LfnAccumulator {
    fragments: Vec<LfnFragment>,
}

impl LfnAccumulator {
    fn push(&mut self, fragment: LfnFragment) {
        self.fragments.push(fragment);
    }

    fn clear(&mut self) {
        self.fragments.clear();
    }

    /// Reconstruct the long name and reset the accumulator.
    fn take_name(&mut self) -> Option<String> {
        if self.fragments.is_empty() {
            return None;
        }
        self.fragments.sort_by_key(|fragment| fragment.ordinal);
        let units: Vec<u16> = self
            .fragments
            .drain(..)
            .flat_map(|fragment| fragment.units)
            .collect();
        Some(String::from_utf16_lossy(&units))
    }
}

/// Scan `sector_count` consecutive directory sectors starting at
/// `first_sector` for an entry matching `target`; returns its first
/// cluster number.
///
/// `sector_count` is the caller's bound, derived from the number of
/// entries expected in the directory.
pub fn find_entry(
    source: &mut dyn SectorSource,
    geometry: &VolumeGeometry,
    first_sector: u64,
    sector_count: u64,
    target: &EntryTarget,
    mode: MatchMode,
) -> Result<u32, AnalyzerError> {
    let bytes_per_sector = geometry.bytes_per_sector as usize;
    let mut pending_lfn = LfnAccumulator::default();

    trace!(
        "scanning {} sectors from {} for '{}'",
        sector_count,
        first_sector,
        target.long_name()
    );

    for sector_index in 0..sector_count {
        let sector = source.read_sectors(first_sector + sector_index, 1)?;
        if sector.len() < bytes_per_sector {
            return Err(AnalyzerError::short_read(bytes_per_sector, sector.len()));
        }

        for record in sector[..bytes_per_sector].chunks_exact(RECORD_SIZE) {
            match parse_record(record) {
                // A gap orphans any fragments before it, same as a
                // deleted entry.
                DirRecord::Empty | DirRecord::Deleted => pending_lfn.clear(),
                DirRecord::Lfn(fragment) => pending_lfn.push(fragment),
                DirRecord::Short(entry) => {
                    let matched = match pending_lfn.take_name() {
                        Some(long_name) => target.matches_long(&long_name, mode),
                        None => target.matches_short(&entry.name, &entry.extension, mode),
                    };
                    if matched {
                        trace!(
                            "'{}' resolved to first cluster {}",
                            target.long_name(),
                            entry.first_cluster
                        );
                        return Ok(entry.first_cluster);
                    }
                }
            }
        }
    }

    Err(AnalyzerError::DirectoryEntryNotFound(target.long_name()))
}

/// One step of the descent from the volume root down to the analysis
/// root: a directory name plus how many entries its parent holds.
#[derive(Debug, Clone)]
pub struct DescentStep {
    pub name: String,
    pub parent_entry_count: usize,
}

/// Walk from the volume root directory down through `steps`, resolving
/// each component in the raw entries of the one above it. Returns the
/// first sector of the final directory's own entries and its first
/// cluster. When `steps` is empty the analysis root is the volume root
/// itself, whose cluster is known from geometry without scanning.
pub fn locate_analysis_root(
    source: &mut dyn SectorSource,
    geometry: &VolumeGeometry,
    steps: &[DescentStep],
    mode: MatchMode,
) -> Result<(u64, u32), AnalyzerError> {
    let mut sector = geometry.first_sector_of_cluster(geometry.root_cluster);
    let mut cluster = geometry.root_cluster;

    for step in steps {
        let target = EntryTarget::directory(&step.name);
        let bound = scan_bound(step.parent_entry_count, geometry);
        let first_cluster = find_entry(source, geometry, sector, bound, &target, mode)?;
        sector = geometry.first_sector_of_cluster(first_cluster);
        cluster = first_cluster;
        debug!(
            "descended into '{}': cluster {}, sector {}",
            step.name, first_cluster, sector
        );
    }

    Ok((sector, cluster))
}

/// Resolve every node below the root of the mirrored tree, in pre-order,
/// so a parent's first sector is always known before its children are
/// looked up. The root's own first sector must have been located first
/// (see [`locate_analysis_root`]).
pub fn resolve_tree(
    tree: &mut FileTree,
    source: &mut dyn SectorSource,
    geometry: &VolumeGeometry,
    mode: MatchMode,
) -> Result<(), AnalyzerError> {
    for id in tree.preorder() {
        if id == ROOT {
            continue;
        }

        let node = tree.node(id);
        let parent = node.parent.ok_or_else(|| {
            AnalyzerError::Internal(format!("node '{}' has no parent", node.display_name()))
        })?;
        let parent_sector = tree.first_sector(parent).ok_or_else(|| {
            AnalyzerError::Internal(format!(
                "parent directory of '{}' is not resolved",
                node.display_name()
            ))
        })?;
        let target = match &node.kind {
            NodeKind::Directory { .. } => EntryTarget::directory(&node.name),
            NodeKind::File { extension } => EntryTarget::file(&node.name, extension),
        };
        let bound = scan_bound(tree.children(parent).len(), geometry);

        let first_cluster = find_entry(source, geometry, parent_sector, bound, &target, mode)?;
        let node = tree.node_mut(id);
        node.first_cluster = Some(first_cluster);
        if node.is_directory() {
            tree.set_first_sector(id, geometry.first_sector_of_cluster(first_cluster));
        }
    }
    Ok(())
}

/// Worst-case records one directory entry can occupy: 20 long-name
/// fragments (255 chars at 13 UTF-16 units each) plus the short entry.
const MAX_RECORDS_PER_ENTRY: u64 = 21;

/// Sectors to scan for a directory expected to hold `entries` entries,
/// sized for every entry carrying a maximum-length long name. A
/// directory always occupies at least one sector.
fn scan_bound(entries: usize, geometry: &VolumeGeometry) -> u64 {
    let records_per_sector = (geometry.bytes_per_sector as u64 / RECORD_SIZE as u64).max(1);
    let records = entries as u64 * MAX_RECORDS_PER_ENTRY;
    ((records + records_per_sector - 1) / records_per_sector).max(1)
}
