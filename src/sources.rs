use crate::config::READER_BUFFER_SIZE;
use crate::emitter::is_gzip_path;
use crate::error::{IngestError, Result};
use flate2::read::MultiGzDecoder;
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub type SnapshotReader = BufReader<MultiGzDecoder<File>>;

/// Lists snapshot files under `root`, newest first.
///
/// Snapshot names embed their date, so reverse lexicographic order of the file
/// name is reverse chronological order. The consolidation ledger relies on
/// this: the first occurrence of a PMID in the run is the most recent one.
pub fn find_snapshots(root: &Path, prefix: &str, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| IngestError::Walk {
            path: root.to_path_buf(),
            source: e,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with(prefix) && name.ends_with(suffix))
            .unwrap_or(false);
        if matches {
            files.push(entry.into_path());
        } else {
            debug!(path = %entry.path().display(), "Skipping non-snapshot file");
        }
    }

    files.sort_by(|a, b| newest_first(a, b));
    Ok(files)
}

fn newest_first(a: &Path, b: &Path) -> Ordering {
    b.file_name()
        .cmp(&a.file_name())
        .then_with(|| b.cmp(a))
}

/// Opens a gzip-compressed snapshot for decoding.
pub fn open_snapshot(path: &Path) -> Result<SnapshotReader> {
    let file = File::open(path).map_err(|e| IngestError::io(path, e))?;
    Ok(BufReader::with_capacity(
        READER_BUFFER_SIZE,
        MultiGzDecoder::new(file),
    ))
}

/// Opens a single-file input (MeSH, OBO), decompressing `.gz` paths.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|e| IngestError::io(path, e))?;
    if is_gzip_path(path) {
        Ok(Box::new(BufReader::with_capacity(
            READER_BUFFER_SIZE,
            MultiGzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(READER_BUFFER_SIZE, file)))
    }
}
