//! # CLI Module
//!
//! Command-line interface for the media library core.
//!
//! ## Usage
//! ```bash
//! # Import folders into a fresh in-memory library and list everything
//! media-lib import ~/Pictures
//!
//! # Only show videos added after item 10, newest first
//! media-lib import ~/Pictures --query "type:video id:>10" --descending
//!
//! # Looser near-duplicate threshold, JSON output
//! media-lib import ~/Pictures --confidence 0.9 --output json
//!
//! # Check how a query parses
//! media-lib parse 'cat -type:video title:"summer trip"'
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use media_library::core::import::{ImportJob, Importer, JobStatus};
use media_library::core::model::{InMemoryLibrary, Item, ItemStore, MediaType};
use media_library::core::search::{parse_query, Search};
use media_library::core::similarity::{
    find_similar_pairs, RebuildOutcome, SimilarPair, SimilarityConfig, SimilarityRebuilder,
    DEFAULT_MIN_CONFIDENCE,
};
use media_library::core::CancellationToken;
use media_library::events::{Event, EventChannel, ImportEvent, SimilarityEvent};
use media_library::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

/// Media Library - import, deduplicate and search your media
#[derive(Parser, Debug)]
#[command(name = "media-lib")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import media from directories, then search the result
    Import {
        /// Directories (or files) to import
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Search query applied after importing
        #[arg(short, long, default_value = "")]
        query: String,

        /// Sort results by descending id
        #[arg(short, long)]
        descending: bool,

        /// Replace groups by their elements in results
        #[arg(short, long)]
        ungroup: bool,

        /// Near-duplicate confidence (0-1]
        #[arg(short, long, default_value_t = DEFAULT_MIN_CONFIDENCE)]
        confidence: f64,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Parse a query and print its rules in evaluation order
    Parse {
        /// The query to parse
        query: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (result paths only)
    Minimal,
}

struct ImportOptions {
    paths: Vec<PathBuf>,
    query: String,
    descending: bool,
    ungroup: bool,
    confidence: f64,
    output: OutputFormat,
    include_hidden: bool,
    verbose: bool,
}

struct Report {
    jobs: Vec<Arc<ImportJob>>,
    results: Vec<Arc<Item>>,
    pairs: Vec<SimilarPair>,
    rebuild: RebuildOutcome,
    duration_ms: u64,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            paths,
            query,
            descending,
            ungroup,
            confidence,
            output,
            include_hidden,
            verbose,
        } => run_import(ImportOptions {
            paths,
            query,
            descending,
            ungroup,
            confidence,
            output,
            include_hidden,
            verbose,
        }),
        Commands::Parse { query } => run_parse(&query),
    }
}

fn run_parse(query: &str) -> Result<()> {
    let search = Search::new(parse_query(query)?, false, false);
    if search.rules().is_empty() {
        println!("(empty query: matches everything)");
    }
    for rule in search.rules() {
        println!("{:>3}  {}", rule.priority(), rule);
    }
    Ok(())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Every supported media file under `paths`, in a stable order
fn collect_media(paths: &[PathBuf], include_hidden: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in paths {
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| include_hidden || !is_hidden(entry));

        for entry in walker {
            match entry {
                Ok(entry)
                    if entry.file_type().is_file()
                        && MediaType::from_path(entry.path()).is_supported() =>
                {
                    files.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable entry: {}", e),
            }
        }
    }
    files
}

fn run_import(options: ImportOptions) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(options.output, OutputFormat::Pretty);

    // Fail on a bad query before doing any work
    let search = Search::new(parse_query(&options.query)?, options.descending, options.ungroup);
    let similarity = SimilarityConfig::new(options.confidence)?;

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Media Library").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let start = Instant::now();
    let files = collect_media(&options.paths, options.include_hidden);
    let library = Arc::new(InMemoryLibrary::new());
    let (sender, receiver) = EventChannel::new();

    let progress = if pretty {
        let pb = ProgressBar::new(files.len() as u64);
        if let Ok(bar_style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("█▓░"));
        }
        pb.set_message("importing");
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Import(ImportEvent::StatusChanged { status, .. }) if status.is_terminal() => {
                    pb.inc(1);
                }
                Event::Similarity(SimilarityEvent::Started { total }) => {
                    pb.set_message("checking similarity");
                    pb.set_length(total as u64);
                    pb.set_position(0);
                }
                Event::Similarity(SimilarityEvent::Progress(p)) => {
                    pb.set_position(p.processed as u64);
                }
                Event::Similarity(SimilarityEvent::Completed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let mut importer = Importer::builder()
        .similarity(similarity)
        .events(sender.clone())
        .build(library.clone())?;

    let mut jobs = Vec::with_capacity(files.len());
    for file in files {
        jobs.push(importer.add_job(file)?);
    }
    for job in &jobs {
        job.wait();
    }
    importer.shutdown();

    let items = library.all_items();
    let rebuild = SimilarityRebuilder::new(similarity).rebuild(
        &items,
        &CancellationToken::new(),
        &sender,
    );

    drop(sender);
    drop(importer);
    event_thread.join().ok();

    let report = Report {
        jobs,
        results: search.refresh(&items),
        pairs: find_similar_pairs(&items, &similarity),
        rebuild,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    match options.output {
        OutputFormat::Pretty => print_pretty_results(&term, &report, options.verbose),
        OutputFormat::Json => print_json_results(&report)?,
        OutputFormat::Minimal => print_minimal_results(&report),
    }

    Ok(())
}

fn display_path(path: &Path) -> String {
    let home = dirs::home_dir().unwrap_or_default();
    match path.strip_prefix(&home) {
        Ok(relative) if !home.as_os_str().is_empty() => format!("~/{}", relative.display()),
        _ => path.display().to_string(),
    }
}

fn describe(item: &Item) -> String {
    match (item.as_media(), item.as_group()) {
        (Some(media), _) => display_path(media.file()),
        (_, Some(group)) => format!("group \"{}\" ({} items)", group.title(), group.len()),
        _ => String::new(),
    }
}

fn count(jobs: &[Arc<ImportJob>], status: JobStatus) -> usize {
    jobs.iter().filter(|job| job.status() == status).count()
}

fn print_pretty_results(term: &Term, report: &Report, verbose: bool) {
    term.write_line("").ok();
    term.write_line(&format!("{} Import Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files processed in {:.1}s",
        style(report.jobs.len()).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    for (label, status) in [
        ("imported", JobStatus::Succeeded),
        ("imported with similar items", JobStatus::SucceededSimilar),
        ("exact duplicates skipped", JobStatus::FailedDuplicate),
        ("failed", JobStatus::FailedImport),
    ] {
        let n = count(&report.jobs, status);
        if n > 0 {
            term.write_line(&format!("  {} {}", style(n).cyan(), label)).ok();
        }
    }
    term.write_line(&format!(
        "  {} items without a similar partner",
        style(report.rebuild.without_similar).cyan()
    ))
    .ok();
    term.write_line("").ok();

    if verbose {
        for job in &report.jobs {
            let detail = match job.status() {
                JobStatus::FailedDuplicate => job
                    .duplicate_of()
                    .map(|existing| format!(" of {}", describe(&existing)))
                    .unwrap_or_default(),
                JobStatus::FailedImport => job
                    .error()
                    .map(|e| format!(": {e}"))
                    .unwrap_or_default(),
                _ => String::new(),
            };
            term.write_line(&format!(
                "  {} {}{}",
                style(format!("[{}]", job.status())).dim(),
                job.source(),
                detail
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    if !report.pairs.is_empty() {
        term.write_line(&format!("{}", style("Similar Items:").bold().underlined()))
            .ok();
        for pair in &report.pairs {
            term.write_line(&format!(
                "  {} {} {} {}",
                style(format!("{:.1}%", pair.similarity * 100.0)).yellow(),
                describe(&pair.first),
                style("~").dim(),
                describe(&pair.second)
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    term.write_line(&format!(
        "{} ({})",
        style("Results:").bold().underlined(),
        report.results.len()
    ))
    .ok();
    for item in &report.results {
        term.write_line(&format!(
            "  {} {}",
            style(item.id()).dim(),
            describe(item)
        ))
        .ok();
    }
}

fn print_json_results(report: &Report) -> Result<()> {
    let output = serde_json::json!({
        "duration_ms": report.duration_ms,
        "without_similar": report.rebuild.without_similar,
        "jobs": report.jobs.iter().map(|job| {
            serde_json::json!({
                "id": job.id(),
                "source": job.source(),
                "status": job.status(),
                "item": job.item().map(|item| item.id()),
                "duplicate_of": job.duplicate_of().map(|item| item.id()),
                "similar_to": job.similar_pairs().iter().map(|p| p.second.id()).collect::<Vec<_>>(),
                "error": job.error(),
            })
        }).collect::<Vec<_>>(),
        "similar_pairs": report.pairs.iter().map(|pair| {
            serde_json::json!({
                "first": pair.first.id(),
                "second": pair.second.id(),
                "similarity": pair.similarity,
            })
        }).collect::<Vec<_>>(),
        "results": report.results.iter().map(|item| {
            serde_json::json!({
                "id": item.id(),
                "added": item.added(),
                "file": item.as_media().map(|media| media.file().to_path_buf()),
                "md5": item.as_media().and_then(|media| media.md5()),
            })
        }).collect::<Vec<_>>(),
    });

    let text = serde_json::to_string_pretty(&output)
        .map_err(|e| media_library::LibraryError::Config(format!("failed to render JSON: {e}")))?;
    println!("{text}");
    Ok(())
}

fn print_minimal_results(report: &Report) {
    for item in &report.results {
        if let Some(media) = item.as_media() {
            println!("{}", media.file().display());
        }
    }
}
