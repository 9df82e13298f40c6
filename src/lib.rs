//! Medgraph: PubMed/MEDLINE citation ingestion into graph node and edge files
//!
//! This crate turns dated MEDLINE XML snapshots into two tab-separated files, one
//! row per citation node and one row per citation-to-topic edge, ready for bulk
//! loading into a graph store:
//!
//! 1. **Discovery** -- Walk the input directory for `medline*.xml.gz` snapshots and
//!    order them newest first
//! 2. **Decoding** -- Stream each snapshot through a recursive-descent XML extractor
//!    into raw citations and deletion notices
//! 3. **Consolidation** -- A run-scoped ledger lets only the newest version of each
//!    PMID through; deletions suppress every older copy
//! 4. **Normalization and emission** -- Build the citation string and MeSH topic
//!    edges and append them to the node and edge sinks
//!
//! The same sinks back two vocabulary converters, for MeSH ASCII descriptor files
//! and OBO ontologies, so all three sources land in one graph layout.
//!
//! # Architecture
//!
//! - **Sequential** -- Sources are processed one at a time, newest first; the ledger
//!   is only correct under that order
//! - **Typed faults** -- Decode and I/O failures abort the run; missing MeSH UIs are
//!   recorded as data-quality faults and skipped
//! - **Transparent gzip** -- Inputs are gzip-decoded; outputs ending in `.gz` are
//!   compressed
//!
//! # Key Modules
//!
//! - [`sources`] -- Snapshot discovery and ordering
//! - [`decoder`] -- MEDLINE XML extraction
//! - [`normalize`] -- Citation string, date rules, topic edges
//! - [`ledger`] -- Once-only PMID gate
//! - [`emitter`] -- Tab-separated node/edge sinks
//! - [`pipeline`] -- The ingest driver
//! - [`mesh`] -- MeSH ASCII converter
//! - [`obo`] -- OBO ontology converter
//! - [`models`] -- Raw citations and output rows
//! - [`stats`] -- Run counters
//! - [`config`] -- Defaults and run options
//! - [`error`] -- Error type
//!
//! # Example Usage
//!
//! ```bash
//! medgraph pubmed -i /data/medline -n nodes.txt.gz -e edges.txt.gz
//! medgraph mesh -i d2017.bin -n mesh_nodes.txt -e mesh_edges.txt
//! medgraph obo -i go.obo -n go_nodes.txt -e go_edges.txt
//! ```

pub mod config;
pub mod decoder;
pub mod emitter;
pub mod error;
pub mod ledger;
pub mod mesh;
pub mod models;
pub mod normalize;
pub mod obo;
pub mod pipeline;
pub mod sources;
pub mod stats;
