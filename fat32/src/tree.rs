// Directory tree mirror
// In-memory tree whose shape mirrors a host path: root plus descendants,
// subdirectories before files, as yielded by the host enumerator. Nodes
// live in a flat arena; children and the non-owning parent back-reference
// are indices into it.

use crate::chain::ClusterChain;
use fatscope_core::{AnalyzerError, HostEnumerator};
use std::path::{Path, PathBuf};

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Kind discriminator with kind-specific fields.
#[derive(Debug, Clone)]
pub enum NodeKind {
    File {
        /// Extension without the dot, for 8.3 matching. Empty if none.
        extension: String,
    },
    Directory {
        children: Vec<NodeId>,
        /// First sector of this directory's own entries, cached once the
        /// directory's first cluster is known.
        first_sector: Option<u64>,
    },
}

/// One mirrored host path entry. `first_cluster` and `chain` start out
/// unset and are filled in by the resolve and chain-build passes.
#[derive(Debug, Clone)]
pub struct FileSystemNode {
    /// Name without extension for files, directory name for directories.
    pub name: String,
    pub full_path: PathBuf,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub first_cluster: Option<u32>,
    pub chain: Option<ClusterChain>,
}

impl FileSystemNode {
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    /// Full display name: `name.extension` for files with an extension,
    /// plain name otherwise. This is what long filenames match against.
    pub fn display_name(&self) -> String {
        match &self.kind {
            NodeKind::File { extension } if !extension.is_empty() => {
                format!("{}.{}", self.name, extension)
            }
            _ => self.name.clone(),
        }
    }
}

/// Arena-backed mirror of one host subtree. Built once per analysis call
/// and discarded with the report.
#[derive(Debug)]
pub struct FileTree {
    nodes: Vec<FileSystemNode>,
}

pub const ROOT: NodeId = NodeId(0);

impl FileTree {
    /// Mirror the host subtree rooted at `root_path`. Fails with
    /// `PathNotFound` if the root does not exist; `AccessDenied` from the
    /// enumerator propagates untouched.
    pub fn build(root_path: &Path, host: &dyn HostEnumerator) -> Result<Self, AnalyzerError> {
        if !host.path_exists(root_path) {
            return Err(AnalyzerError::PathNotFound(root_path.to_path_buf()));
        }

        let mut tree = FileTree { nodes: Vec::new() };
        let root = tree.push_directory(root_path, None);
        tree.populate(root, host)?;
        Ok(tree)
    }

    fn populate(&mut self, dir: NodeId, host: &dyn HostEnumerator) -> Result<(), AnalyzerError> {
        let path = self.nodes[dir.0].full_path.clone();

        for sub in host.list_subdirectories(&path)? {
            let child = self.push_directory(&sub, Some(dir));
            self.add_child(dir, child);
            self.populate(child, host)?;
        }
        for file in host.list_files(&path)? {
            let child = self.push_file(&file, dir);
            self.add_child(dir, child);
        }
        Ok(())
    }

    fn push_directory(&mut self, path: &Path, parent: Option<NodeId>) -> NodeId {
        let name = stem_of(path);
        self.push(FileSystemNode {
            name,
            full_path: path.to_path_buf(),
            parent,
            kind: NodeKind::Directory {
                children: Vec::new(),
                first_sector: None,
            },
            first_cluster: None,
            chain: None,
        })
    }

    fn push_file(&mut self, path: &Path, parent: NodeId) -> NodeId {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_default();
        self.push(FileSystemNode {
            name: stem_of(path),
            full_path: path.to_path_buf(),
            parent: Some(parent),
            kind: NodeKind::File { extension },
            first_cluster: None,
            chain: None,
        })
    }

    fn push(&mut self, node: FileSystemNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn add_child(&mut self, dir: NodeId, child: NodeId) {
        match &mut self.nodes[dir.0].kind {
            NodeKind::Directory { children, .. } => children.push(child),
            NodeKind::File { .. } => unreachable!("files have no children"),
        }
    }

    pub fn node(&self, id: NodeId) -> &FileSystemNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut FileSystemNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Directory { children, .. } => children,
            NodeKind::File { .. } => &[],
        }
    }

    /// Cached first sector of a directory's own entries, if resolved.
    pub fn first_sector(&self, id: NodeId) -> Option<u64> {
        match &self.node(id).kind {
            NodeKind::Directory { first_sector, .. } => *first_sector,
            NodeKind::File { .. } => None,
        }
    }

    pub fn set_first_sector(&mut self, id: NodeId, sector: u64) {
        if let NodeKind::Directory { first_sector, .. } = &mut self.node_mut(id).kind {
            *first_sector = Some(sector);
        }
    }

    /// Pre-order traversal starting at the root.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            for &child in self.children(id).iter().rev() {
                stack.push(child);
            }
        }
        order
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
