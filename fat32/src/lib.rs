// FAT32 volume interpreter
// Read-only: boot-sector geometry, FAT-region decoding, directory-entry
// resolution (8.3 + long filenames), and cluster-chain traversal, composed
// into a pipeline that maps a host path onto disk cluster numbers.

pub mod analyzer;
pub mod boot_sector;
pub mod chain;
pub mod fat_table;
pub mod report;
pub mod resolver;
pub mod tree;

pub use analyzer::{AnalyzerOptions, ClusterAnalyzer};
pub use boot_sector::VolumeGeometry;
pub use chain::{build_chain, ChainLink, ChainQuality, ClusterChain};
pub use fat_table::{read_fat_table, FatEntry, FatEntryKind, FatTable};
pub use resolver::MatchMode;
pub use tree::{FileTree, NodeId, NodeKind};
