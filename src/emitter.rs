use crate::config::{GZIP_SUFFIX, WRITER_BUFFER_SIZE};
use crate::error::{IngestError, Result};
use crate::models::{EdgeRow, NodeRow};
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Destination of one tab-separated table: plain or gzip-compressed.
enum SinkTarget {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl SinkTarget {
    fn finish(self) -> std::io::Result<()> {
        match self {
            SinkTarget::Plain(mut w) => w.flush(),
            SinkTarget::Gzip(gz) => gz.finish()?.flush(),
        }
    }
}

impl Write for SinkTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            SinkTarget::Plain(w) => w.write(buf),
            SinkTarget::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            SinkTarget::Plain(w) => w.flush(),
            SinkTarget::Gzip(w) => w.flush(),
        }
    }
}

/// Append-only TSV table. No header, no quoting: fields must already be free of
/// tabs and newlines.
pub struct TsvSink {
    path: PathBuf,
    writer: Writer<SinkTarget>,
    rows: u64,
}

impl TsvSink {
    /// Creates (truncates) the file; a `.gz` path gets a gzip stream.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| IngestError::io(path, e))?;
        let buffered = BufWriter::with_capacity(WRITER_BUFFER_SIZE, file);
        let target = if is_gzip_path(path) {
            SinkTarget::Gzip(GzEncoder::new(buffered, Compression::best()))
        } else {
            SinkTarget::Plain(buffered)
        };

        let writer = WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .flexible(true)
            .from_writer(target);

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    pub fn write_row<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer.write_record(fields)?;
        self.rows += 1;
        Ok(())
    }

    /// Flushes buffered rows and writes the gzip trailer if any.
    pub fn finish(mut self) -> Result<u64> {
        self.writer
            .flush()
            .map_err(|e| IngestError::io(&self.path, e))?;
        let path = self.path;
        let rows = self.rows;
        let target = self.writer.into_inner().map_err(|e| {
            IngestError::io(&path, std::io::Error::new(e.error().kind(), e.to_string()))
        })?;
        target.finish().map_err(|e| IngestError::io(&path, e))?;
        Ok(rows)
    }
}

/// The node and edge sinks of one conversion run.
pub struct GraphEmitter {
    nodes: TsvSink,
    edges: TsvSink,
}

impl GraphEmitter {
    pub fn create(nodes_path: &Path, edges_path: &Path) -> Result<Self> {
        Ok(Self {
            nodes: TsvSink::create(nodes_path)?,
            edges: TsvSink::create(edges_path)?,
        })
    }

    pub fn write_node(&mut self, node: &NodeRow) -> Result<()> {
        self.nodes
            .write_row([&node.id, &node.label, &node.description])
    }

    /// Edges without context are written as three columns.
    pub fn write_edge(&mut self, edge: &EdgeRow) -> Result<()> {
        match &edge.context {
            Some(context) => self
                .edges
                .write_row([&edge.subject, &edge.object, &edge.relation, context]),
            None => self
                .edges
                .write_row([&edge.subject, &edge.object, &edge.relation]),
        }
    }

    /// Returns `(nodes, edges)` row counts.
    pub fn finish(self) -> Result<(u64, u64)> {
        let nodes = self.nodes.finish()?;
        let edges = self.edges.finish()?;
        Ok((nodes, edges))
    }
}

pub fn is_gzip_path(path: &Path) -> bool {
    path.to_str()
        .map(|p| p.ends_with(GZIP_SUFFIX))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn sample_rows() -> (NodeRow, EdgeRow, EdgeRow) {
        let node = NodeRow {
            id: "100".to_string(),
            label: "A \"quoted\" title".to_string(),
            description: "Smith. A \"quoted\" title. J Med. (March 2017)".to_string(),
        };
        let topic = EdgeRow::new("100", "D001", "has_topic").with_context("major");
        let broader = EdgeRow::new("D002", "D001", "has_broader_term");
        (node, topic, broader)
    }

    #[test]
    fn writes_plain_tsv_without_quoting() {
        let dir = TempDir::new().unwrap();
        let nodes = dir.path().join("nodes.txt");
        let edges = dir.path().join("edges.txt");

        let (node, topic, broader) = sample_rows();
        let mut emitter = GraphEmitter::create(&nodes, &edges).unwrap();
        emitter.write_node(&node).unwrap();
        emitter.write_edge(&topic).unwrap();
        emitter.write_edge(&broader).unwrap();
        assert_eq!(emitter.finish().unwrap(), (1, 2));

        assert_eq!(
            fs::read_to_string(&nodes).unwrap(),
            "100\tA \"quoted\" title\tSmith. A \"quoted\" title. J Med. (March 2017)\n"
        );
        assert_eq!(
            fs::read_to_string(&edges).unwrap(),
            "100\tD001\thas_topic\tmajor\nD002\tD001\thas_broader_term\n"
        );
    }

    #[test]
    fn gzip_sink_has_identical_content() {
        let dir = TempDir::new().unwrap();
        let plain_nodes = dir.path().join("nodes.txt");
        let plain_edges = dir.path().join("edges.txt");
        let gz_nodes = dir.path().join("nodes.txt.gz");
        let gz_edges = dir.path().join("edges.txt.gz");

        let (node, topic, broader) = sample_rows();
        for (n, e) in [(&plain_nodes, &plain_edges), (&gz_nodes, &gz_edges)] {
            let mut emitter = GraphEmitter::create(n, e).unwrap();
            emitter.write_node(&node).unwrap();
            emitter.write_edge(&topic).unwrap();
            emitter.write_edge(&broader).unwrap();
            emitter.finish().unwrap();
        }

        let mut decoded = String::new();
        GzDecoder::new(fs::File::open(&gz_edges).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, fs::read_to_string(&plain_edges).unwrap());

        let raw = fs::read(&gz_nodes).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn empty_output_files_are_created() {
        let dir = TempDir::new().unwrap();
        let nodes = dir.path().join("nodes.txt");
        let edges = dir.path().join("edges.txt");
        GraphEmitter::create(&nodes, &edges)
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(fs::read_to_string(&nodes).unwrap(), "");
        assert_eq!(fs::read_to_string(&edges).unwrap(), "");
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no/such/dir/nodes.txt");
        let err = TsvSink::create(&missing).err().unwrap();
        assert!(matches!(err, IngestError::Io { .. }));
    }

    #[test]
    fn gzip_suffix_detection() {
        assert!(is_gzip_path(Path::new("out/nodes.txt.gz")));
        assert!(!is_gzip_path(Path::new("out/nodes.txt")));
    }
}
