use std::path::PathBuf;
use thiserror::Error;

/// Faults that abort a run.
///
/// Recoverable data-quality problems are not errors; see
/// [`DataQualityFault`](crate::models::DataQualityFault).
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to scan {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to decode {path}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: Box<IngestError>,
    },

    #[error("XML syntax error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("citation without PMID (citation #{position} in document)")]
    MissingPmid { position: usize },

    #[error("invalid number in <{field}>: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("write failed: {0}")]
    Write(#[from] csv::Error),

    #[error("unknown MeSH tree number {tree_number} (ancestor of {ui})")]
    UnknownTreeNumber { tree_number: String, ui: String },

    #[error("OBO parse error at line {line}: {message}")]
    Obo { line: usize, message: String },
}

impl IngestError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
