// Report formatting
// Flattens the resolved, chain-built tree into one row per chain link,
// in pre-order, ready for any table-shaped presentation layer.

use crate::tree::FileTree;
use fatscope_core::ClusterRow;

/// Produce the result rows. For the i-th link of a node's chain the
/// "current cluster" column is the node's first cluster when i = 0, else
/// the value of the previous entry; nodes without a chain (e.g. empty
/// directories) get exactly one placeholder row.
pub fn format_report(tree: &FileTree) -> Vec<ClusterRow> {
    let mut rows = Vec::new();

    for id in tree.preorder() {
        let node = tree.node(id);
        let path = node.full_path.display().to_string();

        match &node.chain {
            Some(chain) if !chain.is_empty() => {
                for link in &chain.links {
                    rows.push(ClusterRow {
                        object_path: path.clone(),
                        current_cluster: link.cluster.to_string(),
                        next_cluster_hex: link.entry.to_hex(),
                        next_cluster_status: link.entry.status(),
                    });
                }
            }
            _ => rows.push(ClusterRow::placeholder(path)),
        }
    }

    rows
}
