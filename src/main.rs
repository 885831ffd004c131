//! Command-line entry point: generate report archives and slice them into CSV.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use reportzip::cli::{Command, CommonArgs, ExtractArgs, GenerateArgs};
use reportzip::coordinator::{available_workers, default_chunk_size};
use reportzip::sink::save_slices;
use reportzip::{
    ArchiveOptions, BuiltinLoader, Cli, CompressionMethod, ExtractOptions, FileFormat, FileSystemLoader, ReportArchive,
    ReportSettings, TemplateLoader, ValueRange, discover_archives, extract_all,
};

/// Application entry point.
///
/// Installs the stderr log subscriber at the level chosen by `-v`/`-q`, then
/// runs the requested subcommand. `run` generates and then extracts.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::Generate { common, generate } => generate_archives(common, generate).await,
        Command::Extract { common, extract } => extract_archives(common, extract).await,
        Command::Run {
            common,
            generate,
            extract,
        } => {
            generate_archives(common, generate).await?;
            extract_archives(common, extract).await
        }
    }
}

/// Generate report archives into the data directory.
///
/// The template is resolved once, from `--template-dir` when given and from
/// the bundled templates otherwise, and shared by every archive.
///
/// # Arguments
///
/// * `common` - Data directory and template name
/// * `args` - Archive count, documents per archive, format and value ranges
///
/// # Returns
///
/// Returns `Ok(())` once every `archive_<i>.zip` is saved, or the first error.
async fn generate_archives(common: &CommonArgs, args: &GenerateArgs) -> Result<()> {
    // Validate the format and the template before touching the filesystem
    let format: FileFormat = args.format.parse()?;
    let loader: Box<dyn TemplateLoader> = match &args.template_dir {
        Some(dir) => Box::new(FileSystemLoader::new(dir)),
        None => Box::new(BuiltinLoader),
    };
    let template = loader.load(&common.template)?;

    let options = ArchiveOptions {
        documents: args.documents,
        compression: if args.stored {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflate
        },
        settings: ReportSettings {
            level: ValueRange::new(args.min_level, args.max_level)?,
            objects: ValueRange::new(args.min_objects, args.max_objects)?,
        },
    };

    tokio::fs::create_dir_all(&common.data_dir)
        .await
        .with_context(|| format!("cannot create {}", common.data_dir.display()))?;

    info!(archives = args.archives, documents = args.documents, "generating archives");
    for i in 0..args.archives {
        let path = common.data_dir.join(format!("archive_{i}.zip"));
        ReportArchive::build(template.clone(), format, &options)?
            .save(&path)
            .await
            .with_context(|| format!("cannot save {}", path.display()))?;
    }
    info!(archives = args.archives, dir = %common.data_dir.display(), "generation finished");

    Ok(())
}

/// Extract every archive in the data directory into `first.csv` and `second.csv`.
///
/// # Arguments
///
/// * `common` - Data directory and the template the archives were rendered with
/// * `args` - Chunk size and worker count; unset values are derived from the
///   archive count and the available parallelism
///
/// # Returns
///
/// Returns `Ok(())` once both CSV files are in place. On any failure neither
/// file from this run is written.
async fn extract_archives(common: &CommonArgs, args: &ExtractArgs) -> Result<()> {
    let archives = discover_archives(&common.data_dir)
        .await
        .with_context(|| format!("cannot list archives in {}", common.data_dir.display()))?;

    let workers = args.workers.unwrap_or_else(available_workers);
    let options = ExtractOptions {
        chunk_size: args
            .chunk_size
            .unwrap_or_else(|| default_chunk_size(archives.len(), workers)),
        workers,
    };

    // All chunks must succeed before anything is written
    let slices = extract_all(&archives, &common.template, options).await?;

    save_slices(&common.data_dir, &slices)
        .await
        .with_context(|| format!("cannot save slices in {}", common.data_dir.display()))?;

    Ok(())
}
