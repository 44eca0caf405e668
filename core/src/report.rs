use serde::{Deserialize, Serialize};

/// One row of the analysis result: a single link of some node's cluster
/// chain, or a placeholder for a node without a chain. Consumable as a
/// table by any presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRow {
    /// Host path of the file or directory this link belongs to.
    pub object_path: String,
    /// Cluster number this link describes (decimal), empty for placeholders.
    pub current_cluster: String,
    /// Masked FAT value at that cluster, 8-digit zero-padded hex.
    pub next_cluster_hex: String,
    /// "Bad Cluster", "Last Cluster in chain", or the next cluster number.
    pub next_cluster_status: String,
}

impl ClusterRow {
    /// Placeholder row for a node with no cluster chain, e.g. an empty
    /// directory.
    pub fn placeholder(object_path: String) -> Self {
        Self {
            object_path,
            current_cluster: String::new(),
            next_cluster_hex: String::new(),
            next_cluster_status: String::new(),
        }
    }
}
