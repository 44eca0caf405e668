use clap::{Parser, Subcommand};
use fatscope_core::progress::{ProgressEvent, ProgressSink};
use fatscope_core::{CancelToken, ClusterRow, VolumeScanner};
use fatscope_fat32::{AnalyzerOptions, ClusterAnalyzer, MatchMode};
use fatscope_platform::{copy_directory, PlatformVolumeScanner, StdHostEnumerator};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fatscope")]
#[command(about = "Read-only FAT32 cluster-chain analyzer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List volumes the analyzer can open
    Volumes,
    /// Show the cluster chains of a file or directory subtree
    Analyze {
        /// Absolute path on a FAT32 volume
        path: PathBuf,
        /// Match directory entries by substring containment (historical
        /// behavior) instead of exact name comparison
        #[arg(long)]
        substring_match: bool,
        /// Emit rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Copy a subtree, then analyze source and copy to compare layouts
    CopyCompare {
        /// Absolute source path on a FAT32 volume
        source: PathBuf,
        /// Destination directory (created if absent)
        dest: PathBuf,
        #[arg(long)]
        substring_match: bool,
    },
}

/// Prints phase transitions and FAT-read progress to stderr.
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase(phase) => eprintln!("[fatscope] {}", phase.describe()),
            ProgressEvent::FatChunk {
                sectors_read,
                sectors_total,
            } => {
                if sectors_read == sectors_total {
                    eprintln!("[fatscope] FAT region read: {} sectors", sectors_total);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("[fatscope] cancellation requested");
                cancel.cancel();
            }
        });
    }

    let scanner = PlatformVolumeScanner;
    let host = StdHostEnumerator;

    match cli.command {
        Commands::Volumes => {
            let volumes = scanner.enumerate_volumes().await?;
            if volumes.is_empty() {
                println!("No volumes found.");
            } else {
                for volume in volumes {
                    match scanner.volume_root(&volume) {
                        Ok(root) => println!("{}  (root: {})", volume, root.display()),
                        Err(_) => println!("{}", volume),
                    }
                }
            }
        }
        Commands::Analyze {
            path,
            substring_match,
            json,
        } => {
            let rows = run_analysis(&scanner, &host, &path, substring_match, &cancel).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_table(&rows);
            }
        }
        Commands::CopyCompare {
            source,
            dest,
            substring_match,
        } => {
            println!("== Before copy: {}", source.display());
            let before = run_analysis(&scanner, &host, &source, substring_match, &cancel).await?;
            print_table(&before);

            let stats = copy_directory(&source, &dest)?;
            println!(
                "\nCopied {} files ({} bytes) to {}",
                stats.files_copied,
                stats.bytes_copied,
                dest.display()
            );

            println!("\n== After copy: {}", dest.display());
            let after = run_analysis(&scanner, &host, &dest, substring_match, &cancel).await?;
            print_table(&after);
        }
    }

    Ok(())
}

async fn run_analysis(
    scanner: &PlatformVolumeScanner,
    host: &StdHostEnumerator,
    path: &Path,
    substring_match: bool,
    cancel: &CancelToken,
) -> anyhow::Result<Vec<ClusterRow>> {
    let options = AnalyzerOptions {
        match_mode: if substring_match {
            MatchMode::Substring
        } else {
            MatchMode::Exact
        },
    };
    let analyzer = ClusterAnalyzer::with_options(scanner, host, options);
    let rows = analyzer.analyze(path, &ConsoleProgress, cancel).await?;
    Ok(rows)
}

fn print_table(rows: &[ClusterRow]) {
    let path_width = rows
        .iter()
        .map(|row| row.object_path.len())
        .chain(std::iter::once("Object".len()))
        .max()
        .unwrap_or(6);

    println!(
        "{:<width$}  {:>15}  {:>12}  {}",
        "Object",
        "Current cluster",
        "Next (hex)",
        "Next cluster",
        width = path_width
    );
    for row in rows {
        println!(
            "{:<width$}  {:>15}  {:>12}  {}",
            row.object_path,
            row.current_cluster,
            row.next_cluster_hex,
            row.next_cluster_status,
            width = path_width
        );
    }
}
