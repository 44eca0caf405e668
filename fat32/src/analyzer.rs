// Analysis pipeline
// Composes the interpreter stages into one call that maps a host path
// onto disk cluster numbers: check volume, parse boot sector, locate the
// analysis root on disk, mirror the host tree, resolve directory entries,
// read the FAT, build chains, format rows.

use crate::boot_sector::{fs_type_label, VolumeGeometry};
use crate::chain::build_chain;
use crate::fat_table::read_fat_table;
use crate::report::format_report;
use crate::resolver::{locate_analysis_root, resolve_tree, DescentStep, MatchMode};
use crate::tree::{FileTree, ROOT};
use fatscope_core::progress::{ProgressEvent, ProgressSink};
use fatscope_core::{
    AnalyzerError, AnalysisPhase, CancelToken, ClusterRow, HostEnumerator, VolumeScanner,
};
use log::{debug, info, warn};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzerOptions {
    pub match_mode: MatchMode,
}

/// One analysis run owns its volume handle, FAT buffer, and tree
/// exclusively; nothing is shared across concurrent calls.
pub struct ClusterAnalyzer<'a> {
    scanner: &'a dyn VolumeScanner,
    host: &'a dyn HostEnumerator,
    options: AnalyzerOptions,
}

impl<'a> ClusterAnalyzer<'a> {
    pub fn new(scanner: &'a dyn VolumeScanner, host: &'a dyn HostEnumerator) -> Self {
        Self::with_options(scanner, host, AnalyzerOptions::default())
    }

    pub fn with_options(
        scanner: &'a dyn VolumeScanner,
        host: &'a dyn HostEnumerator,
        options: AnalyzerOptions,
    ) -> Self {
        Self {
            scanner,
            host,
            options,
        }
    }

    /// Analyze the subtree rooted at `path` and return its cluster rows.
    ///
    /// Every fatal condition aborts the whole call; there is no partial-
    /// result mode and no retrying. Cancellation is honored between
    /// phases and between FAT read chunks.
    pub async fn analyze(
        &self,
        path: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Vec<ClusterRow>, AnalyzerError> {
        let phase = |p: AnalysisPhase| progress.report(ProgressEvent::Phase(p));

        phase(AnalysisPhase::CheckingVolume);
        cancel.check()?;
        let volume = self.scanner.volume_of_path(path)?;
        if !self.scanner.is_volume_available(&volume).await? {
            return Err(AnalyzerError::VolumeUnavailable(volume.to_string()));
        }
        info!("analyzing '{}' on volume {}", path.display(), volume);

        phase(AnalysisPhase::ReadingBootSector);
        cancel.check()?;
        let mut source = self.scanner.open_volume(&volume).await?;
        let boot = source.read_sectors(0, 1)?;
        let geometry = VolumeGeometry::parse(&boot)?;
        source.set_bytes_per_sector(geometry.bytes_per_sector as u32);
        match fs_type_label(&boot) {
            Some(label) if label == "FAT32" => {}
            Some(label) => warn!("volume type label is '{}', expected FAT32", label),
            None => warn!("boot sector carries no filesystem type label"),
        }
        debug!(
            "geometry: {} bytes/sector, {} sectors/cluster, FAT at {}, data at {}",
            geometry.bytes_per_sector,
            geometry.sectors_per_cluster,
            geometry.first_fat_sector(),
            geometry.first_data_sector()
        );

        phase(AnalysisPhase::LocatingAnalysisRoot);
        cancel.check()?;
        let steps = self.descent_steps(&volume, path)?;
        let (root_sector, root_cluster) = locate_analysis_root(
            source.as_mut(),
            &geometry,
            &steps,
            self.options.match_mode,
        )?;

        phase(AnalysisPhase::BuildingFileTree);
        cancel.check()?;
        let mut tree = FileTree::build(path, self.host)?;
        tree.set_first_sector(ROOT, root_sector);
        tree.node_mut(ROOT).first_cluster = Some(root_cluster);

        phase(AnalysisPhase::ResolvingDirectoryEntries);
        cancel.check()?;
        resolve_tree(&mut tree, source.as_mut(), &geometry, self.options.match_mode)?;

        phase(AnalysisPhase::ReadingFat);
        cancel.check()?;
        let fat = read_fat_table(source.as_mut(), &geometry, cancel, progress)?;

        phase(AnalysisPhase::BuildingClusterChains);
        cancel.check()?;
        for id in tree.preorder() {
            if let Some(first_cluster) = tree.node(id).first_cluster {
                let chain = build_chain(first_cluster, &fat);
                tree.node_mut(id).chain = Some(chain);
            }
        }

        phase(AnalysisPhase::FormattingReport);
        cancel.check()?;
        Ok(format_report(&tree))
    }

    /// Path components between the volume root and the analysis root,
    /// each bounded by the entry count of the directory above it.
    fn descent_steps(
        &self,
        volume: &fatscope_core::VolumeId,
        path: &Path,
    ) -> Result<Vec<DescentStep>, AnalyzerError> {
        let root = self.scanner.volume_root(volume)?;
        let relative = path
            .strip_prefix(&root)
            .map_err(|_| AnalyzerError::PathNotFound(path.to_path_buf()))?;

        let mut steps = Vec::new();
        let mut parent = root.clone();
        for component in relative.components() {
            let component = Path::new(component.as_os_str());
            let name = component
                .file_stem()
                .unwrap_or(component.as_os_str())
                .to_string_lossy()
                .to_string();
            steps.push(DescentStep {
                name,
                parent_entry_count: self.host.entry_count(&parent)?,
            });
            parent = parent.join(component);
        }
        Ok(steps)
    }
}
