use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use errpt_json::batch::{parse_sources, BatchError, ErrorPolicy, Source};
use errpt_json::config::ToolConfig;
use errpt_json::{aggregator, serializer, Document, ReportParser};

#[derive(Parser)]
#[command(author, version, about = "Convert AIX `errpt -a` reports to JSON and merge report history")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to an optional config file
    #[arg(short, long, default_value = "errpt2json.json", global = true)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every raw report file in a directory to a sibling .json file
    Convert(ConvertArgs),

    /// Merge raw reports (and an optional existing JSON document) into one document
    Merge(MergeArgs),
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Directory to scan (non-recursive)
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// Extension of raw report files
    #[arg(long)]
    ext: Option<String>,

    /// Emit compact JSON instead of 4-space indented output
    #[arg(long)]
    compact: bool,

    /// Delete each raw file after its JSON has been written
    #[arg(long)]
    remove_sources: bool,

    /// Convert the remaining files when one fails, reporting all failures at the end
    #[arg(long)]
    keep_going: bool,
}

#[derive(clap::Args)]
struct MergeArgs {
    /// Raw report files to merge
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Destination for the merged JSON document
    #[arg(short, long)]
    output: PathBuf,

    /// Previously written JSON document to merge on top of
    #[arg(short, long)]
    base: Option<PathBuf>,

    /// Emit compact JSON instead of 4-space indented output
    #[arg(long)]
    compact: bool,

    /// Parse every input before failing, reporting all failures at once
    #[arg(long)]
    keep_going: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> errpt_json::Result<()> {
    let config = ToolConfig::load_or_default(&cli.config)?;
    match cli.command {
        Commands::Convert(args) => convert(args, config),
        Commands::Merge(args) => merge(args, config),
    }
}

fn policy(keep_going: bool, config: &ToolConfig) -> ErrorPolicy {
    if keep_going {
        ErrorPolicy::CollectAll
    } else {
        config.error_policy
    }
}

/// Finds raw report files directly inside `dir`, in name order.
fn find_raw_files(dir: &Path, ext: &str) -> errpt_json::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|e| e == ext)
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn convert(args: ConvertArgs, config: ToolConfig) -> errpt_json::Result<()> {
    let ext = args.ext.as_deref().unwrap_or(&config.source_extension);
    let pretty = config.pretty && !args.compact;
    let remove_sources = args.remove_sources || config.remove_sources;
    let policy = policy(args.keep_going, &config);

    let files = find_raw_files(&args.dir, ext)?;
    if files.is_empty() {
        warn!(dir = %args.dir.display(), ext, "no raw report files found");
        return Ok(());
    }

    let parser = ReportParser::new();
    let mut failures = Vec::new();
    for path in files {
        let text = fs::read_to_string(&path)?;
        match parser.parse(&text) {
            Ok(document) => {
                let destination = path.with_extension("json");
                write_document(&document, &destination, pretty)?;
                info!(
                    source = %path.display(),
                    destination = %destination.display(),
                    records = document.len(),
                    "converted"
                );
                if remove_sources {
                    fs::remove_file(&path)?;
                }
            }
            Err(parse_err) => {
                let name = path.display().to_string();
                warn!(source = %name, error = %parse_err, "skipping source");
                match policy {
                    ErrorPolicy::FailFast => {
                        return Err(BatchError::Source {
                            name,
                            source: parse_err,
                        }
                        .into())
                    }
                    ErrorPolicy::CollectAll => failures.push((name, parse_err)),
                }
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(BatchError::Multiple(failures).into())
    }
}

fn merge(args: MergeArgs, config: ToolConfig) -> errpt_json::Result<()> {
    let pretty = config.pretty && !args.compact;
    let policy = policy(args.keep_going, &config);

    let mut sources = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let text = fs::read_to_string(path)?;
        sources.push(Source::new(path.display().to_string(), text));
    }
    let documents = parse_sources(&sources, policy)?;

    let base = args
        .base
        .as_deref()
        .map(read_base_document)
        .transpose()?;

    let merged = aggregator::merge(base.as_ref(), &documents)?;
    write_document(&merged, &args.output, pretty)?;
    info!(
        destination = %args.output.display(),
        records = merged.len(),
        "merged"
    );
    Ok(())
}

fn read_base_document(path: &Path) -> errpt_json::Result<Document> {
    let text = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    Ok(serializer::from_value(&value)?)
}

fn write_document(document: &Document, path: &Path, pretty: bool) -> errpt_json::Result<()> {
    let mut json = serializer::to_json(document, pretty)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}
