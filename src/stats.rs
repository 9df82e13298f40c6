use serde::Serialize;

/// Counters collected during a PubMed ingest run
#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestStats {
    pub sources_processed: u64,
    pub citations_seen: u64,
    pub citations_written: u64,
    pub duplicates_skipped: u64,
    pub deletions_recorded: u64,
    pub edges_written: u64,
    pub data_quality_faults: u64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_sources(&mut self) {
        self.sources_processed += 1;
    }

    pub fn add_citations_seen(&mut self, count: u64) {
        self.citations_seen += count;
    }

    pub fn inc_written(&mut self) {
        self.citations_written += 1;
    }

    pub fn inc_duplicates(&mut self) {
        self.duplicates_skipped += 1;
    }

    pub fn add_deletions(&mut self, count: u64) {
        self.deletions_recorded += count;
    }

    pub fn add_edges(&mut self, count: u64) {
        self.edges_written += count;
    }

    pub fn add_faults(&mut self, count: u64) {
        self.data_quality_faults += count;
    }
}

/// Row counts of a single-file MeSH or OBO conversion
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConvertStats {
    pub nodes: u64,
    pub edges: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_zero() {
        let stats = IngestStats::new();
        assert_eq!(stats.sources_processed, 0);
        assert_eq!(stats.citations_seen, 0);
        assert_eq!(stats.citations_written, 0);
        assert_eq!(stats.duplicates_skipped, 0);
        assert_eq!(stats.deletions_recorded, 0);
        assert_eq!(stats.edges_written, 0);
        assert_eq!(stats.data_quality_faults, 0);
    }

    #[test]
    fn mixed_operations() {
        let mut stats = IngestStats::new();
        stats.inc_sources();
        stats.add_citations_seen(3);
        stats.inc_written();
        stats.inc_written();
        stats.inc_duplicates();
        stats.add_deletions(4);
        stats.add_edges(10);
        stats.add_edges(5);
        stats.add_faults(1);

        assert_eq!(stats.sources_processed, 1);
        assert_eq!(stats.citations_seen, 3);
        assert_eq!(stats.citations_written, 2);
        assert_eq!(stats.duplicates_skipped, 1);
        assert_eq!(stats.deletions_recorded, 4);
        assert_eq!(stats.edges_written, 15);
        assert_eq!(stats.data_quality_faults, 1);
    }

    #[test]
    fn serializes_to_json() {
        let mut stats = IngestStats::new();
        stats.inc_written();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["citations_written"], 1);
        assert_eq!(json["edges_written"], 0);
    }
}
