//! TrashCan: convert the TrashCan 1.0 dataset into a Supervisely project.
//!
//! The dataset ships as COCO-style annotation files next to directories of
//! video frames. Each split becomes a dataset of the target project; every
//! COCO annotation becomes its bbox rectangle plus the polygons of its
//! segmentation that survive the vertex and area filters, and every image is
//! tagged with the video it was taken from.
//!
//! # Modules
//!
//! - [`settings`]: Dataset metadata, class table and conversion knobs
//! - [`coco`]: COCO schema types and the per-split annotation index
//! - [`geometry`]: Points, polygons and rectangles in pixel space
//! - [`sly`]: Supervisely project model and its JSON form
//! - [`convert`]: COCO annotation to labels conversion
//! - [`validation`]: Pre-flight checks of a split
//! - [`source`]: Locating (and downloading) the dataset on disk
//! - [`upload`]: Upload targets (project directory, platform API)
//! - [`pipeline`]: The end-to-end run
//! - [`error`]: Error types for trashcan operations

pub mod coco;
pub mod convert;
pub mod error;
pub mod geometry;
pub mod pipeline;
mod progress;
pub mod settings;
pub mod sly;
pub mod source;
pub mod upload;
pub mod validation;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

pub use error::TrashcanError;
pub use settings::Settings;

/// The trashcan CLI application.
#[derive(Parser)]
#[command(name = "trashcan")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Hide progress bars.
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Check every split of a dataset for errors and warnings.
    Check(CheckArgs),
    /// Convert a dataset into a project directory on disk.
    Export(ExportArgs),
    /// Convert a dataset and upload it to a platform instance.
    #[cfg(feature = "remote")]
    Upload(UploadArgs),
    /// Download and unpack the original dataset archive(s).
    #[cfg(feature = "remote")]
    Download(DownloadArgs),
    /// Print the effective settings as JSON.
    Settings(SettingsArgs),
}

/// Settings file option shared by every subcommand.
#[derive(clap::Args)]
struct ConfigArgs {
    /// YAML settings file; omitted fields keep their built-in values.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> Result<Settings, TrashcanError> {
        Settings::load(self.config.as_deref())
    }
}

/// Overrides applied on top of the loaded settings.
#[derive(clap::Args)]
struct ProjectArgs {
    /// Name of the project to create.
    #[arg(long)]
    project_name: Option<String>,

    /// Images per upload batch.
    #[arg(long)]
    batch_size: Option<usize>,
}

impl ProjectArgs {
    fn apply(&self, mut settings: Settings) -> Result<Settings, TrashcanError> {
        if let Some(name) = &self.project_name {
            settings.project_name = name.clone();
        }
        if let Some(batch_size) = self.batch_size {
            settings.upload.batch_size = batch_size;
        }
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Dataset root (or the directory it was unpacked into).
    #[arg(long)]
    root: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Dataset root (or the directory it was unpacked into).
    #[arg(long)]
    root: PathBuf,

    /// Directory the project directory is created in.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    project: ProjectArgs,
}

#[cfg(feature = "remote")]
#[derive(clap::Args)]
struct UploadArgs {
    /// Dataset root (or the directory it was unpacked into).
    #[arg(long)]
    root: PathBuf,

    /// Workspace the project is created in.
    #[arg(long)]
    workspace_id: u64,

    /// Platform address, e.g. https://app.supervisely.com.
    #[arg(long, env = "SERVER_ADDRESS")]
    server_address: String,

    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    api_token: String,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    project: ProjectArgs,
}

#[cfg(feature = "remote")]
#[derive(clap::Args)]
struct DownloadArgs {
    /// Directory archives are downloaded and unpacked into.
    #[arg(long)]
    storage_dir: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(clap::Args)]
struct SettingsArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Fail if fields required for publishing are missing.
    #[arg(long)]
    release: bool,
}

/// Run the trashcan CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), TrashcanError> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let show_progress = !cli.quiet;
    match cli.command {
        Some(Commands::Check(args)) => run_check(args),
        Some(Commands::Export(args)) => run_export(args, show_progress),
        #[cfg(feature = "remote")]
        Some(Commands::Upload(args)) => run_upload(args, show_progress),
        #[cfg(feature = "remote")]
        Some(Commands::Download(args)) => run_download(args, show_progress),
        Some(Commands::Settings(args)) => run_settings(args),
        None => {
            println!("trashcan {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Convert the TrashCan 1.0 dataset into a Supervisely project.");
            println!();
            println!("Run 'trashcan --help' for usage information.");
            Ok(())
        }
    }
}

/// Report of one split, as printed by `check`.
#[derive(Serialize)]
struct SplitCheck {
    split: String,
    error_count: usize,
    warning_count: usize,
    #[serde(flatten)]
    report: validation::ValidationReport,
}

fn check_splits(
    root: &std::path::Path,
    settings: &Settings,
) -> Result<Vec<SplitCheck>, TrashcanError> {
    let mut checks = Vec::with_capacity(settings.splits.len());

    for split in &settings.splits {
        let mut report = validation::ValidationReport::new();
        match source::locate_splits(root, std::slice::from_ref(split)) {
            Ok(found) => {
                for paths in found {
                    let coco = coco::read_coco_file(&paths.annotations)?;
                    let files = source::list_images(&paths.images_dir)?;
                    report.extend(validation::validate_split(&coco, &files, &settings.classes));
                }
            }
            Err(err @ TrashcanError::SplitNotFound { .. }) => {
                report.add(validation::ValidationIssue::error(
                    validation::IssueCode::SplitNotFound,
                    err.to_string(),
                    validation::IssueContext::Split {
                        name: split.name.clone(),
                    },
                ));
            }
            Err(err) => return Err(err),
        }

        checks.push(SplitCheck {
            split: split.name.clone(),
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        });
    }
    Ok(checks)
}

/// Execute the check subcommand.
fn run_check(args: CheckArgs) -> Result<(), TrashcanError> {
    let settings = args.config.load()?;
    let checks = check_splits(&args.root, &settings)?;

    match args.output.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&checks).map_err(|source| {
                TrashcanError::JsonWrite {
                    path: PathBuf::from("<stdout>"),
                    source,
                }
            })?;
            println!("{json}");
        }
        "text" => {
            for check in &checks {
                println!("== {} ==", check.split);
                print!("{}", check.report);
                println!();
            }
        }
        other => {
            return Err(TrashcanError::UnsupportedOutput(format!(
                "'{}' (supported: text, json)",
                other
            )));
        }
    }

    let mut report = validation::ValidationReport::new();
    for check in checks {
        report.extend(check.report);
    }
    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(TrashcanError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

/// Execute the export subcommand.
fn run_export(args: ExportArgs, show_progress: bool) -> Result<(), TrashcanError> {
    let settings = args.project.apply(args.config.load()?)?;
    let mut writer = upload::ProjectDirWriter::new(&args.out);
    let summary = pipeline::convert_and_upload(&mut writer, &settings, 0, &args.root, show_progress)?;

    print!("{summary}");
    if let Some(dir) = writer.project_dir(summary.project.id) {
        println!("Written to {}", dir.display());
    }
    Ok(())
}

/// Execute the upload subcommand.
#[cfg(feature = "remote")]
fn run_upload(args: UploadArgs, show_progress: bool) -> Result<(), TrashcanError> {
    let settings = args.project.apply(args.config.load()?)?;
    let mut api = upload::SuperviselyApi::new(&args.server_address, &args.api_token)?;
    let summary = pipeline::convert_and_upload(
        &mut api,
        &settings,
        args.workspace_id,
        &args.root,
        show_progress,
    )?;
    print!("{summary}");

    let missing = settings.missing_release_fields();
    if !missing.is_empty() {
        log::warn!(
            "Project uploaded, but these fields must be set before release: {}",
            missing.join(", ")
        );
    }
    Ok(())
}

/// Execute the download subcommand.
#[cfg(feature = "remote")]
fn run_download(args: DownloadArgs, show_progress: bool) -> Result<(), TrashcanError> {
    let settings = args.config.load()?;
    let download_source = settings.download_original_url.as_ref().ok_or_else(|| {
        TrashcanError::InvalidSettings("download_original_url is not set".to_string())
    })?;

    let root = source::download::fetch(download_source, &args.storage_dir, show_progress)?;
    println!("{}", root.display());
    Ok(())
}

/// Execute the settings subcommand.
fn run_settings(args: SettingsArgs) -> Result<(), TrashcanError> {
    let settings = args.config.load()?;

    let json = serde_json::to_string_pretty(&settings).map_err(|source| {
        TrashcanError::JsonWrite {
            path: PathBuf::from("<stdout>"),
            source,
        }
    })?;
    println!("{json}");

    if args.release {
        let missing = settings.missing_release_fields();
        if !missing.is_empty() {
            return Err(TrashcanError::InvalidSettings(format!(
                "missing release fields: {}",
                missing.join(", ")
            )));
        }
    }
    Ok(())
}
