/// File name prefix of MEDLINE/PubMed snapshot files
pub const SNAPSHOT_PREFIX: &str = "medline";

/// File name suffix of MEDLINE/PubMed snapshot files
pub const SNAPSHOT_SUFFIX: &str = ".xml.gz";

/// Output paths ending with this suffix are gzip-compressed
pub const GZIP_SUFFIX: &str = ".gz";

/// Buffer size for node/edge sink writers
pub const WRITER_BUFFER_SIZE: usize = 128 * 1024;

/// Buffer size for decompressed snapshot readers
pub const READER_BUFFER_SIZE: usize = 256 * 1024;

/// Initial capacity of the consolidation ledger
pub const LEDGER_CAPACITY: usize = 100_000;

/// Progress update interval (log every N citations within a source)
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Options for one PubMed ingest run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub input_dir: String,
    pub nodes_path: String,
    pub edges_path: String,
    pub prefix: String,
    pub suffix: String,
    /// Rewrite two-digit legacy years as `20yy`
    pub expand_two_digit_years: bool,
    pub report_path: Option<String>,
}

impl IngestConfig {
    pub fn new(input_dir: &str, nodes_path: &str, edges_path: &str) -> Self {
        Self {
            input_dir: input_dir.to_string(),
            nodes_path: nodes_path.to_string(),
            edges_path: edges_path.to_string(),
            prefix: SNAPSHOT_PREFIX.to_string(),
            suffix: SNAPSHOT_SUFFIX.to_string(),
            expand_two_digit_years: true,
            report_path: None,
        }
    }
}
