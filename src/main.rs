use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use medgraph::config::{IngestConfig, SNAPSHOT_PREFIX, SNAPSHOT_SUFFIX};
use medgraph::emitter::GraphEmitter;
use medgraph::error::Result as IngestResult;
use medgraph::sources::open_input;
use medgraph::stats::ConvertStats;
use std::io::BufRead;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "medgraph")]
#[command(about = "Convert PubMed/MEDLINE snapshots and vocabularies into graph node and edge files")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consolidate MEDLINE XML snapshots into citation nodes and MeSH topic edges
    Pubmed(PubmedArgs),
    /// Convert a MeSH ASCII file (d20xx.bin, q20xx.bin, c20xx.bin)
    Mesh(ConvertArgs),
    /// Convert an OBO ontology file
    Obo(ConvertArgs),
}

#[derive(Args)]
struct PubmedArgs {
    /// Directory searched recursively for snapshot files
    #[arg(short, long)]
    input: String,

    /// Node output file (.gz for compressed output)
    #[arg(short, long)]
    nodes: String,

    /// Edge output file (.gz for compressed output)
    #[arg(short, long)]
    edges: String,

    /// Snapshot file name prefix
    #[arg(long, default_value = SNAPSHOT_PREFIX)]
    prefix: String,

    /// Snapshot file name suffix
    #[arg(long, default_value = SNAPSHOT_SUFFIX)]
    suffix: String,

    /// Keep two-digit publication years as-is instead of rewriting them as 20yy
    #[arg(long)]
    no_year_expansion: bool,

    /// Write run statistics as JSON to this file
    #[arg(long)]
    report: Option<String>,
}

#[derive(Args)]
struct ConvertArgs {
    /// Input file (.gz is decompressed)
    #[arg(short, long)]
    input: String,

    /// Node output file (.gz for compressed output)
    #[arg(short, long)]
    nodes: String,

    /// Edge output file (.gz for compressed output)
    #[arg(short, long)]
    edges: String,
}

fn run_pubmed(args: PubmedArgs) -> Result<()> {
    let mut config = IngestConfig::new(&args.input, &args.nodes, &args.edges);
    config.prefix = args.prefix;
    config.suffix = args.suffix;
    config.expand_two_digit_years = !args.no_year_expansion;
    config.report_path = args.report;

    let start = Instant::now();
    let stats = medgraph::pipeline::run_ingest(&config)
        .with_context(|| format!("PubMed ingest from {} failed", config.input_dir))?;
    let duration = start.elapsed();

    println!();
    println!("=== Summary ===");
    println!("Total time:         {:.2}s", duration.as_secs_f64());
    println!();
    println!("Sources processed:  {}", stats.sources_processed);
    println!("Citations seen:     {}", stats.citations_seen);
    println!("Citations written:  {}", stats.citations_written);
    println!("Duplicates skipped: {}", stats.duplicates_skipped);
    println!("Deletions:          {}", stats.deletions_recorded);
    println!("Edges written:      {}", stats.edges_written);
    println!("Data faults:        {}", stats.data_quality_faults);

    Ok(())
}

fn run_convert<F>(args: ConvertArgs, kind: &str, convert: F) -> Result<()>
where
    F: FnOnce(Box<dyn BufRead>, &Path, &mut GraphEmitter) -> IngestResult<ConvertStats>,
{
    let start = Instant::now();
    let path = Path::new(&args.input);
    let input = open_input(path)?;
    let mut emitter = GraphEmitter::create(Path::new(&args.nodes), Path::new(&args.edges))?;

    let stats = convert(input, path, &mut emitter)
        .with_context(|| format!("{kind} conversion of {} failed", args.input))?;
    emitter.finish()?;
    info!(
        duration_secs = start.elapsed().as_secs_f64(),
        "{kind} conversion finished"
    );

    println!();
    println!("=== Summary ===");
    println!("Nodes written:      {}", stats.nodes);
    println!("Edges written:      {}", stats.edges);

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: failed to set tracing subscriber: {e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Pubmed(args) => run_pubmed(args),
        Commands::Mesh(args) => run_convert(args, "MeSH", |input, path, emitter| {
            medgraph::mesh::convert_mesh(input, path, emitter)
        }),
        Commands::Obo(args) => run_convert(args, "OBO", |input, path, emitter| {
            medgraph::obo::convert_obo(input, path, emitter)
        }),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
