//! # CLI Module
//!
//! Command-line interface for the photo catalog.
//!
//! ## Usage
//! ```bash
//! # Catalog the assets directory
//! photo-catalog --assets-dir ~/Pictures catalog
//!
//! # List duplicates as JSON
//! photo-catalog duplicates --output json
//!
//! # Move two photos into an album
//! photo-catalog move ~/Pictures/a.jpg ~/Pictures/b.jpg --to ~/Pictures/album
//!
//! # Configure and run a sync
//! photo-catalog sync add ~/Pictures ~/Backup --include-sub-folders
//! photo-catalog sync run
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_catalog::config::{AppSettings, DefaultPathProvider, FixedPathProvider, PathProvider};
use photo_catalog::core::model::{Asset, Folder, SyncAssetsDirectoriesDefinition};
use photo_catalog::error::{CatalogError, Result};
use photo_catalog::events::{null_sender, CatalogChange, CatalogSummary, Event, EventChannel};
use photo_catalog::{init_tracing, Application};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::thread;

/// Photo Catalog - Keep track of every photo you own
#[derive(Parser, Debug)]
#[command(name = "photo-catalog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Folder holding settings, the catalog database and backups
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory to catalog (overrides the settings file)
    #[arg(long, global = true)]
    assets_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Catalog new, modified and deleted files in the assets directory
    Catalog {
        /// Maximum number of new or updated assets in this run
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// List cataloged sub folders
    Folders {
        /// Parent folder (defaults to the assets directory)
        path: Option<PathBuf>,

        /// Include hidden folders
        #[arg(long)]
        include_hidden: bool,
    },
    /// List cataloged assets of a folder
    Assets {
        /// Folder to list
        directory: PathBuf,
    },
    /// Find duplicated assets
    Duplicates {
        /// Match by perceptual distance instead of exact hash
        #[arg(long)]
        perceptual: bool,

        /// Maximum perceptual distance (0-64)
        #[arg(short, long)]
        threshold: Option<u32>,
    },
    /// Move (or copy) cataloged assets into another folder
    Move {
        /// Asset files to move
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Destination folder
        #[arg(long)]
        to: PathBuf,

        /// Keep the original files (copy instead of move)
        #[arg(long)]
        copy: bool,
    },
    /// Delete cataloged assets from disk and from the catalog
    Delete {
        /// Asset files to delete
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Actually delete; without this flag only a preview is shown
        #[arg(long)]
        yes: bool,
    },
    /// Manage and run directory syncs
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
    /// Write today's catalog backup
    Backup,
}

#[derive(Subcommand, Debug)]
enum SyncAction {
    /// Add a source/destination pair
    Add {
        source: String,
        destination: String,

        /// Mirror subdirectories too
        #[arg(long)]
        include_sub_folders: bool,

        /// Delete destination images missing from the source
        #[arg(long)]
        delete_assets_not_in_source: bool,
    },
    /// Show the configured pairs
    List,
    /// Sync every configured pair
    Run,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = load_settings(cli.data_dir.as_deref())?;
    if let Some(assets_dir) = cli.assets_dir {
        settings.assets_directory = assets_dir;
    }

    let term = Term::stderr();
    let output = cli.output;

    match cli.command {
        Commands::Catalog { batch_size } => {
            if let Some(batch_size) = batch_size {
                settings.catalog_batch_size = batch_size;
            }
            run_catalog(&term, Application::open(settings)?, output)
        }
        Commands::Folders {
            path,
            include_hidden,
        } => {
            let app = Application::open(settings)?;
            let parent = Folder::new(path.unwrap_or_else(|| app.get_initial_folder()));
            let folders = app.get_sub_folders(&parent, include_hidden)?;
            match output {
                OutputFormat::Json => print_json(&folders),
                OutputFormat::Pretty => {
                    for folder in &folders {
                        println!("{}", folder.path.display());
                    }
                }
            }
            Ok(())
        }
        Commands::Assets { directory } => {
            let app = Application::open(settings)?;
            let assets = app.get_assets(&directory)?;
            match output {
                OutputFormat::Json => print_json(&assets),
                OutputFormat::Pretty => print_assets(&term, &assets),
            }
            Ok(())
        }
        Commands::Duplicates {
            perceptual,
            threshold,
        } => {
            settings.use_perceptual_hash |= perceptual;
            if let Some(threshold) = threshold {
                settings.perceptual_threshold = threshold;
            }
            let app = Application::open(settings)?;
            let groups = app.get_duplicated_assets()?;
            match output {
                OutputFormat::Json => print_json(&groups),
                OutputFormat::Pretty => print_duplicates(&term, &groups),
            }
            Ok(())
        }
        Commands::Move { files, to, copy } => {
            let app = Application::open(settings)?;
            let assets = resolve_assets(&app, &files)?;
            app.move_assets(&assets, &to, copy, &null_sender())?;
            term.write_line(&format!(
                "{} {} {} to {}",
                style("✓").green().bold(),
                if copy { "Copied" } else { "Moved" },
                style(assets.len()).cyan(),
                to.display()
            ))
            .ok();
            Ok(())
        }
        Commands::Delete { files, yes } => {
            let app = Application::open(settings)?;
            let assets = resolve_assets(&app, &files)?;
            if !yes {
                for asset in &assets {
                    term.write_line(&format!("  {} {}", style("○").dim(), asset.full_path().display()))
                        .ok();
                }
                term.write_line(&format!(
                    "{}",
                    style("Nothing was deleted. Run again with --yes to delete these files.").dim()
                ))
                .ok();
                return Ok(());
            }
            app.delete_assets(&assets, &null_sender())?;
            term.write_line(&format!(
                "{} Deleted {} assets",
                style("✓").green().bold(),
                style(assets.len()).cyan()
            ))
            .ok();
            Ok(())
        }
        Commands::Sync { action } => run_sync(&term, Application::open(settings)?, action, output),
        Commands::Backup => {
            let app = Application::open(settings)?;
            app.write_backup()?;
            term.write_line(&format!("{} Backup written", style("✓").green().bold()))
                .ok();
            Ok(())
        }
    }
}

/// Settings from the data folder; written out on first run so they can be edited
fn load_settings(data_dir: Option<&Path>) -> Result<AppSettings> {
    let provider: Box<dyn PathProvider> = match data_dir {
        Some(dir) => Box::new(FixedPathProvider(dir.to_path_buf())),
        None => Box::new(DefaultPathProvider),
    };

    let settings = AppSettings::load(provider.as_ref())?;
    let path = AppSettings::settings_path(&provider.application_data_folder()?);
    if !path.exists() {
        settings.save_to(&path)?;
    }
    Ok(settings)
}

fn resolve_assets(app: &Application, files: &[PathBuf]) -> Result<Vec<Asset>> {
    files
        .iter()
        .map(|file| {
            let directory = file.parent().unwrap_or_else(|| Path::new(""));
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            app.get_assets(directory)?
                .into_iter()
                .find(|a| a.file_name == file_name)
                .ok_or_else(|| {
                    CatalogError::argument(format!("{} is not cataloged", file.display()))
                })
        })
        .collect()
}

fn run_catalog(term: &Term, app: Application, output: OutputFormat) -> Result<()> {
    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Photo Catalog").bold().cyan(),
            style(app.get_initial_folder().display()).dim()
        ))
        .ok();
    }

    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Catalog(CatalogChange::Started { total_files, .. }) => {
                    pb.set_length(total_files as u64);
                }
                Event::Catalog(CatalogChange::FolderCreated { path }) => {
                    pb.set_message(path.display().to_string());
                }
                Event::Catalog(
                    CatalogChange::AssetCreated(p) | CatalogChange::AssetUpdated(p),
                ) => {
                    pb.set_position(p.processed as u64);
                    pb.set_message(
                        p.path
                            .file_name()
                            .unwrap_or_default()
                            .to_string_lossy()
                            .into_owned(),
                    );
                }
                Event::Catalog(CatalogChange::BackupStarted) => {
                    pb.set_message("writing backup");
                }
                Event::Catalog(CatalogChange::Ended { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let cancel = AtomicBool::new(false);
    let result = app.catalog_assets(&sender, &cancel);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let summary = result?;
    match output {
        OutputFormat::Pretty => print_summary(term, &summary),
        OutputFormat::Json => print_json(&summary),
    }
    Ok(())
}

fn run_sync(term: &Term, app: Application, action: SyncAction, output: OutputFormat) -> Result<()> {
    match action {
        SyncAction::Add {
            source,
            destination,
            include_sub_folders,
            delete_assets_not_in_source,
        } => {
            let mut configuration = app.get_sync_assets_configuration()?;
            configuration
                .definitions
                .push(SyncAssetsDirectoriesDefinition {
                    include_sub_folders,
                    delete_assets_not_in_source,
                    ..SyncAssetsDirectoriesDefinition::new(source, destination)
                });
            app.set_sync_assets_configuration(configuration)?;
            Ok(())
        }
        SyncAction::List => {
            let configuration = app.get_sync_assets_configuration()?;
            match output {
                OutputFormat::Json => print_json(&configuration),
                OutputFormat::Pretty => {
                    for (i, d) in configuration.definitions.iter().enumerate() {
                        term.write_line(&format!(
                            "  {} {} → {}{}{}",
                            style(format!("{}.", i + 1)).bold(),
                            d.source_directory,
                            d.destination_directory,
                            if d.include_sub_folders { " (recursive)" } else { "" },
                            if d.delete_assets_not_in_source { " (mirror)" } else { "" },
                        ))
                        .ok();
                    }
                }
            }
            Ok(())
        }
        SyncAction::Run => {
            let results = app.sync_assets(&null_sender())?;
            match output {
                OutputFormat::Json => print_json(&results),
                OutputFormat::Pretty => {
                    for result in &results {
                        term.write_line(&result.message).ok();
                    }
                }
            }
            Ok(())
        }
    }
}

fn print_summary(term: &Term, summary: &CatalogSummary) {
    term.write_line("").ok();
    term.write_line(&format!(
        "{} Catalog Complete",
        style("✓").green().bold()
    ))
    .ok();
    term.write_line(&format!(
        "  {} created, {} updated, {} deleted in {:.1}s",
        style(summary.assets_created).cyan(),
        style(summary.assets_updated).cyan(),
        style(summary.assets_deleted).cyan(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
    if summary.assets_failed > 0 {
        term.write_line(&format!(
            "  {} assets could not be read",
            style(summary.assets_failed).red()
        ))
        .ok();
    }
    if summary.batch_limit_reached {
        term.write_line(&format!(
            "  {}",
            style("Batch limit reached. Run catalog again to continue.").yellow()
        ))
        .ok();
    }
}

fn print_assets(term: &Term, assets: &[Asset]) {
    for asset in assets {
        let flag = if asset.is_corrupted() {
            style("corrupted").red().to_string()
        } else {
            format!("{}x{}", asset.pixel.asset.width, asset.pixel.asset.height)
        };
        term.write_line(&format!(
            "  {} {} {}",
            asset.file_name,
            style(format_bytes(asset.file_properties.size)).dim(),
            style(flag).dim()
        ))
        .ok();
    }
}

fn print_duplicates(term: &Term, groups: &[Vec<Asset>]) {
    if groups.is_empty() {
        term.write_line(&format!("  {} No duplicates found!", style("✓").green()))
            .ok();
        return;
    }

    for (i, group) in groups.iter().enumerate() {
        term.write_line(&format!(
            "  {} ({} assets)",
            style(format!("Group {}:", i + 1)).bold(),
            group.len()
        ))
        .ok();
        for asset in group {
            term.write_line(&format!("    {} {}", style("○").dim(), asset.full_path().display()))
                .ok();
        }
        term.write_line("").ok();
    }

    term.write_line(&format!(
        "{}",
        style("Remember: No files were deleted. Review carefully before taking action.").dim()
    ))
    .ok();
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
