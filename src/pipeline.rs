//! PubMed ingest driver: enumerate, decode, consolidate, normalize, emit.
//!
//! Strictly sequential. Sources must be processed newest first; the ledger then
//! keeps the first sighting of each PMID and drops every older copy. Running
//! sources in any other order (or in parallel) silently produces stale rows.

use crate::config::{IngestConfig, PROGRESS_INTERVAL};
use crate::decoder::decode_snapshot;
use crate::emitter::GraphEmitter;
use crate::error::{IngestError, Result};
use crate::ledger::ConsolidationLedger;
use crate::models::DecodedSnapshot;
use crate::normalize::{normalize, NormalizeOptions};
use crate::sources::{find_snapshots, open_snapshot};
use crate::stats::IngestStats;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Runs a full ingest: discovers snapshots under `config.input_dir` and writes
/// the node and edge files.
pub fn run_ingest(config: &IngestConfig) -> Result<IngestStats> {
    let root = Path::new(&config.input_dir);
    let sources = find_snapshots(root, &config.prefix, &config.suffix)?;
    info!(
        sources = sources.len(),
        root = %root.display(),
        "Snapshot sources found"
    );
    if sources.is_empty() {
        warn!(root = %root.display(), "No snapshot files matched; output will be empty");
    }

    let mut emitter = GraphEmitter::create(
        Path::new(&config.nodes_path),
        Path::new(&config.edges_path),
    )?;
    let options = NormalizeOptions {
        expand_two_digit_years: config.expand_two_digit_years,
    };

    let stats = ingest_sources(&sources, &mut emitter, &options)?;
    let (nodes, edges) = emitter.finish()?;
    info!(nodes, edges, "Output files finished");

    if let Some(report) = &config.report_path {
        write_report(Path::new(report), &stats)?;
    }

    Ok(stats)
}

/// Processes `sources` in the given order with a fresh ledger.
pub fn ingest_sources(
    sources: &[PathBuf],
    emitter: &mut GraphEmitter,
    options: &NormalizeOptions,
) -> Result<IngestStats> {
    let mut ledger = ConsolidationLedger::new();
    let mut stats = IngestStats::new();
    let pb = make_progress_bar(sources.len() as u64);

    for (i, path) in sources.iter().enumerate() {
        pb.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        info!(
            source = i + 1,
            total = sources.len(),
            path = %path.display(),
            "Processing snapshot"
        );

        let snapshot =
            decode_snapshot(open_snapshot(path)?).map_err(|e| IngestError::Snapshot {
                path: path.clone(),
                source: Box::new(e),
            })?;
        consolidate_snapshot(snapshot, &mut ledger, emitter, options, &mut stats)?;
        stats.inc_sources();
        pb.inc(1);
    }

    pb.finish_and_clear();
    debug!(ledger = ledger.len(), "Ledger size at end of run");
    Ok(stats)
}

/// Applies one decoded snapshot against the ledger and emits the survivors.
///
/// Deletions are ledgered before the snapshot's own citations, so a snapshot
/// that both carries and deletes a PMID emits nothing for it.
pub fn consolidate_snapshot(
    snapshot: DecodedSnapshot,
    ledger: &mut ConsolidationLedger,
    emitter: &mut GraphEmitter,
    options: &NormalizeOptions,
    stats: &mut IngestStats,
) -> Result<()> {
    stats.add_deletions(snapshot.deleted.len() as u64);
    for pmid in &snapshot.deleted {
        ledger.mark_seen(*pmid);
    }

    stats.add_citations_seen(snapshot.citations.len() as u64);
    for (n, citation) in snapshot.citations.iter().enumerate() {
        if !ledger.mark_seen(citation.pmid) {
            debug!(pmid = citation.pmid, "Skipping superseded or deleted citation");
            stats.inc_duplicates();
            continue;
        }

        let normalized = normalize(citation, options);
        for fault in &normalized.faults {
            warn!(
                pmid = fault.pmid,
                kind = ?fault.kind,
                name = %fault.name,
                "MeSH annotation without UI skipped"
            );
        }
        stats.add_faults(normalized.faults.len() as u64);

        emitter.write_node(&normalized.node)?;
        for edge in &normalized.edges {
            emitter.write_edge(edge)?;
        }
        stats.inc_written();
        stats.add_edges(normalized.edges.len() as u64);

        if (n as u64 + 1) % PROGRESS_INTERVAL == 0 {
            debug!(citations = n + 1, "Citations processed in source");
        }
    }

    Ok(())
}

fn write_report(path: &Path, stats: &IngestStats) -> Result<()> {
    let file = File::create(path).map_err(|e| IngestError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, stats)
        .map_err(|e| IngestError::io(path, e.into()))?;
    writer.flush().map_err(|e| IngestError::io(path, e))?;
    info!(path = %path.display(), "Run report written");
    Ok(())
}

fn make_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} snapshots {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}
