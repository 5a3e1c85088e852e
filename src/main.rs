//! Talya Viewer
//!
//! Command line front end for inspecting `.talya` documents and standalone
//! ink-stroke files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use talya_viewer::document::TalyaDocument;
use talya_viewer::ink::BinaryStrokeFile;
use talya_viewer::LoaderConfig;

#[derive(Parser)]
#[command(
    name = "talya-viewer",
    version,
    about = "Inspect .talya documents and binary ink-stroke files"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a document's manifest and page table, optionally loading pages.
    Inspect(InspectArgs),

    /// Print the header and strokes of a standalone ink file.
    Ink(InkArgs),
}

#[derive(Parser)]
struct InspectArgs {
    #[arg(value_name = "FILE")]
    path: PathBuf,

    /// Page to load and summarise (repeatable).
    #[arg(long = "page", value_name = "N")]
    pages: Vec<usize>,

    /// Load every page.
    #[arg(long)]
    all: bool,

    /// Print the manifest as JSON.
    #[arg(long)]
    json: bool,

    /// Accept files without a .talya extension.
    #[arg(long = "any-extension")]
    any_extension: bool,

    /// Verify page bundle size and checksum against the page index.
    #[arg(long = "verify")]
    verify: bool,
}

#[derive(Parser)]
struct InkArgs {
    #[arg(value_name = "FILE")]
    path: PathBuf,

    /// Load a single stroke by position instead of the whole file.
    #[arg(long = "stroke", value_name = "N")]
    stroke: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talya_viewer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Inspect(args) => inspect(args).await,
        Command::Ink(args) => ink(args),
    }
}

async fn inspect(args: InspectArgs) -> Result<()> {
    let mut config = LoaderConfig::from_env();
    if args.any_extension {
        config.enforce_extension = false;
    }
    if args.verify {
        config.verify_checksums = true;
    }

    let document = TalyaDocument::open(&args.path, config)
        .await
        .with_context(|| format!("Failed to open {}", args.path.display()))?;
    let manifest = document.manifest();

    if args.json {
        println!("{}", serde_json::to_string_pretty(manifest)?);
    } else {
        println!("Title:       {}", manifest.title);
        println!("Document id: {}", manifest.doc_id);
        println!("Version:     {}", manifest.version);
        println!("Mode:        {}", manifest.processing_mode);
        println!("Original:    {}", manifest.original_file);
        if let Some(created) = manifest.created_at_utc() {
            println!("Created:     {}", created.to_rfc3339());
        }
        if let Some(modified) = manifest.modified_at_utc() {
            println!("Modified:    {}", modified.to_rfc3339());
        }
    }

    println!("Pages:       {}", document.page_count());
    match document.search_index() {
        Some(index) => println!(
            "Search:      {} words, {} unique",
            index.statistics.total_words, index.statistics.unique_words
        ),
        None => println!("Search:      none"),
    }

    for entry in document.page_index() {
        println!("  [{:>4}] {} ({} bytes)", entry.index, entry.filename, entry.size);
    }

    let requested: Vec<usize> = if args.all {
        (0..document.page_count()).collect()
    } else {
        args.pages
    };
    if requested.is_empty() {
        return Ok(());
    }

    let results = document.load_pages(&requested).await;
    for (index, result) in requested.iter().zip(results) {
        let page = result.with_context(|| format!("Failed to load page {}", index))?;
        let points: usize = page.strokes().iter().map(|s| s.points.len()).sum();
        let size = page
            .dimensions()
            .map(|d| format!("{}x{}", d.width, d.height))
            .unwrap_or_else(|| "unknown size".to_string());

        println!(
            "Page {}: {}, {} strokes ({} points), {} text elements, {} shapes, {} images",
            index,
            size,
            page.strokes().len(),
            points,
            page.text_elements().len(),
            page.shapes().len(),
            page.images().len()
        );
    }

    Ok(())
}

fn ink(args: InkArgs) -> Result<()> {
    let mut file = BinaryStrokeFile::new(&args.path);

    let strokes: Vec<_> = match args.stroke {
        Some(ordinal) => file
            .load_stroke(ordinal)
            .with_context(|| format!("Failed to read {}", args.path.display()))?
            .into_iter()
            .collect(),
        None => file
            .load_all()
            .with_context(|| format!("Failed to read {}", args.path.display()))?,
    };

    if let Some(header) = file.header() {
        println!("Version:     {}", header.version);
        println!("Strokes:     {}", header.stroke_count);
        println!("Compressed:  {}", header.is_compressed());
        println!("Differential: {}", header.is_differential());
    }

    for stroke in &strokes {
        let tool = stroke
            .ink_tool()
            .map(|t| format!("{:?}", t))
            .unwrap_or_else(|| format!("tool {}", stroke.tool));
        println!(
            "  {} {} #{:08x} width {} - {} points",
            stroke.id,
            tool,
            stroke.color,
            stroke.width,
            stroke.points.len()
        );
    }

    if strokes.is_empty() && args.stroke.is_some() {
        println!("  no stroke at that position");
    }
    Ok(())
}
