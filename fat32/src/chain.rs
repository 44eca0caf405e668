// Cluster-chain traversal
// Walks the in-memory FAT from a starting cluster to end-of-chain. The
// walk is guarded: an explicit bounds check against the FAT buffer and a
// visited set so a corrupted FAT can never loop or run past the buffer.

use crate::fat_table::{FatEntry, FatTable};
use log::warn;
use std::collections::HashSet;

/// How a chain walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainQuality {
    /// Ended in an end-of-chain or bad-cluster entry.
    Complete,
    /// A cluster's FAT entry fell outside the FAT buffer.
    Truncated,
    /// A cluster number was about to repeat.
    Cyclic,
}

/// One link of a chain: a cluster number and the FAT entry stored at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLink {
    pub cluster: u32,
    pub entry: FatEntry,
}

/// Ordered cluster sequence for one file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterChain {
    pub links: Vec<ChainLink>,
    pub quality: ChainQuality,
}

impl ClusterChain {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn clusters(&self) -> impl Iterator<Item = u32> + '_ {
        self.links.iter().map(|link| link.cluster)
    }
}

/// Walk the FAT from `start_cluster`. Pure function of its inputs; always
/// terminates (bounded by the visited set and the FAT buffer length).
pub fn build_chain(start_cluster: u32, fat: &FatTable) -> ClusterChain {
    let mut links = Vec::new();
    let mut visited: HashSet<u32> = HashSet::new();
    let mut current = start_cluster;

    loop {
        let entry = match fat.entry(current) {
            Some(entry) => entry,
            None => {
                warn!(
                    "cluster {} is outside the FAT buffer ({} entries), chain truncated",
                    current,
                    fat.entry_count()
                );
                return ClusterChain {
                    links,
                    quality: ChainQuality::Truncated,
                };
            }
        };

        visited.insert(current);
        links.push(ChainLink {
            cluster: current,
            entry,
        });

        if entry.is_terminal() {
            return ClusterChain {
                links,
                quality: ChainQuality::Complete,
            };
        }

        let next = entry.value();
        if visited.contains(&next) {
            warn!(
                "cycle in FAT chain: cluster {} points back to {}",
                current, next
            );
            return ClusterChain {
                links,
                quality: ChainQuality::Cyclic,
            };
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fat_table::FatEntryKind;

    fn table_with(entries: &[(u32, u32)]) -> FatTable {
        let max = entries.iter().map(|(c, _)| *c).max().unwrap_or(0);
        let mut data = vec![0u8; (max as usize + 1) * 4];
        for (cluster, value) in entries {
            let offset = *cluster as usize * 4;
            data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
        FatTable::new(data)
    }

    #[test]
    fn complete_chain_ends_at_end_of_chain() {
        let fat = table_with(&[(5, 6), (6, 7), (7, 0x0FFF_FFFF)]);
        let chain = build_chain(5, &fat);
        assert_eq!(chain.quality, ChainQuality::Complete);
        assert_eq!(chain.clusters().collect::<Vec<_>>(), vec![5, 6, 7]);
        assert_eq!(chain.links.last().unwrap().entry.kind(), FatEntryKind::EndOfChain);
    }

    #[test]
    fn bad_cluster_terminates_chain() {
        let fat = table_with(&[(5, 6), (6, 0x0FFF_FFF7)]);
        let chain = build_chain(5, &fat);
        assert_eq!(chain.quality, ChainQuality::Complete);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.links[1].entry.kind(), FatEntryKind::Bad);
    }

    #[test]
    fn cycle_is_detected_not_looped() {
        let fat = table_with(&[(5, 6), (6, 5)]);
        let chain = build_chain(5, &fat);
        assert_eq!(chain.quality, ChainQuality::Cyclic);
        assert_eq!(chain.clusters().collect::<Vec<_>>(), vec![5, 6]);
    }

    #[test]
    fn self_loop_is_cyclic_after_one_link() {
        let fat = table_with(&[(9, 9)]);
        let chain = build_chain(9, &fat);
        assert_eq!(chain.quality, ChainQuality::Cyclic);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn start_outside_buffer_is_truncated_and_empty() {
        // 16-byte FAT holds entries 0..=3 only.
        let fat = FatTable::new(vec![0u8; 16]);
        let chain = build_chain(10, &fat);
        assert_eq!(chain.quality, ChainQuality::Truncated);
        assert!(chain.is_empty());
    }

    #[test]
    fn walk_running_past_buffer_is_truncated() {
        // Entry 2 points at cluster 1000, far past the 4-entry buffer.
        let fat = table_with(&[(2, 1000), (3, 0)]);
        let chain = build_chain(2, &fat);
        assert_eq!(chain.quality, ChainQuality::Truncated);
        assert_eq!(chain.len(), 1);
    }
}
