//! MeSH ASCII (`d2017.bin`, `q2017.bin`, `c2017.bin`) to graph rows.
//!
//! Records are `KEY = value` lines separated by `*NEWRECORD`. Nodes are written
//! as records close; `has_broader_term` edges are derived from tree numbers
//! (`MN`) once the whole file is read, since a parent may appear after its child.

use crate::emitter::GraphEmitter;
use crate::error::{IngestError, Result};
use crate::models::{EdgeRow, NodeRow};
use crate::stats::ConvertStats;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

pub const HAS_BROADER_TERM: &str = "has_broader_term";

const NEW_RECORD: &str = "*NEWRECORD";

#[derive(Default)]
struct MeshRecord {
    record_type: String,
    ui: String,
    name: String,
    description: String,
    tree_numbers: Vec<String>,
}

impl MeshRecord {
    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "RECTYPE" => self.record_type = value.trim().to_string(),
            "UI" => self.ui = value.trim().to_string(),
            // supplementary concepts have no scope note; the name doubles as description
            "NM" if self.record_type == "C" => {
                self.name = value.trim().to_string();
                self.description = self.name.clone();
            }
            "MH" if self.record_type == "D" => self.name = value.trim().to_string(),
            "SH" if self.record_type == "Q" => self.name = value.trim().to_string(),
            "MS" => self.description = value.replace('\t', " ").trim().to_string(),
            "MN" => self.tree_numbers.push(value.trim().to_string()),
            _ => {}
        }
    }

    /// Wrapped scope-note lines carry no key.
    fn continue_description(&mut self, line: &str) {
        self.description.push(' ');
        self.description.push_str(line.replace('\t', " ").trim());
    }
}

/// Converts one MeSH ASCII file read from `input`; `path` names it in errors.
/// Tree numbers are global to the file.
pub fn convert_mesh<R: BufRead>(
    input: R,
    path: &Path,
    emitter: &mut GraphEmitter,
) -> Result<ConvertStats> {
    let mut record = MeshRecord::default();
    let mut last_key = String::new();
    let mut tree_numbers: BTreeMap<String, String> = BTreeMap::new();
    let mut stats = ConvertStats::default();

    for line in input.lines() {
        let line = line.map_err(|e| IngestError::io(path, e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == NEW_RECORD {
            flush_record(&mut record, &mut tree_numbers, emitter, &mut stats)?;
            last_key.clear();
            continue;
        }

        match line.split_once(" = ") {
            Some((key, value)) => {
                record.apply(key, value);
                last_key.clear();
                last_key.push_str(key);
            }
            None if last_key == "MS" => record.continue_description(line),
            None => debug!(line, "Ignoring line without key"),
        }
    }
    flush_record(&mut record, &mut tree_numbers, emitter, &mut stats)?;

    stats.edges = write_broader_terms(&tree_numbers, emitter)?;
    info!(
        nodes = stats.nodes,
        edges = stats.edges,
        tree_numbers = tree_numbers.len(),
        "MeSH conversion complete"
    );
    Ok(stats)
}

fn flush_record(
    record: &mut MeshRecord,
    tree_numbers: &mut BTreeMap<String, String>,
    emitter: &mut GraphEmitter,
    stats: &mut ConvertStats,
) -> Result<()> {
    let record = std::mem::take(record);
    if record.ui.is_empty() {
        return Ok(());
    }

    emitter.write_node(&NodeRow {
        id: record.ui.clone(),
        label: record.name,
        description: record.description,
    })?;
    stats.nodes += 1;

    for tree_number in record.tree_numbers {
        tree_numbers.insert(tree_number, record.ui.clone());
    }
    Ok(())
}

/// `C14.280.647` is narrower than `C14.280`. Top-level numbers have no parent.
fn write_broader_terms(
    tree_numbers: &BTreeMap<String, String>,
    emitter: &mut GraphEmitter,
) -> Result<u64> {
    let mut written = FxHashSet::default();

    for (tree_number, ui) in tree_numbers {
        let Some((parent, _)) = tree_number.rsplit_once('.') else {
            continue;
        };
        let parent_ui = tree_numbers
            .get(parent)
            .ok_or_else(|| IngestError::UnknownTreeNumber {
                tree_number: parent.to_string(),
                ui: ui.clone(),
            })?;

        if written.insert((ui.as_str(), parent_ui.as_str())) {
            emitter.write_edge(&EdgeRow::new(ui, parent_ui, HAS_BROADER_TERM))?;
        }
    }

    Ok(written.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
*NEWRECORD
RECTYPE = D
MH = Calcimycin
AQ = AA AD AE
MN = D03.633.100.221.173
MS = An ionophorous, polyether antibiotic from Streptomyces chartreusensis. It binds and
transports CALCIUM and other divalent cations across membranes.
UI = D000001

*NEWRECORD
RECTYPE = D
MH = Pyrans
MN = D03.633.100.221
MS = Compounds with a six-membered ring.
UI = D011714

*NEWRECORD
RECTYPE = D
MH = Heterocyclic Compounds, 2-Ring
MN = D03.633.100
MN = D03.633
MS = A class of organic compounds.
UI = D006574

*NEWRECORD
RECTYPE = D
MH = Heterocyclic Compounds
MN = D03
UI = D006571
";

    struct Output {
        _dir: TempDir,
        nodes: PathBuf,
        edges: PathBuf,
    }

    fn convert(input: &str) -> (Result<ConvertStats>, Output) {
        convert_bytes(input.as_bytes())
    }

    fn convert_bytes(input: &[u8]) -> (Result<ConvertStats>, Output) {
        let dir = TempDir::new().unwrap();
        let nodes = dir.path().join("nodes.txt");
        let edges = dir.path().join("edges.txt");
        let mut emitter = GraphEmitter::create(&nodes, &edges).unwrap();
        let result = convert_mesh(input, Path::new("d2017.bin"), &mut emitter);
        emitter.finish().unwrap();
        (
            result,
            Output {
                _dir: dir,
                nodes,
                edges,
            },
        )
    }

    #[test]
    fn writes_descriptor_nodes() {
        let (result, out) = convert(SAMPLE);
        assert_eq!(result.unwrap().nodes, 4);

        let nodes = fs::read_to_string(&out.nodes).unwrap();
        let first = nodes.lines().next().unwrap();
        assert_eq!(
            first,
            "D000001\tCalcimycin\tAn ionophorous, polyether antibiotic from Streptomyces \
             chartreusensis. It binds and transports CALCIUM and other divalent cations \
             across membranes."
        );
        assert!(nodes.contains("D006571\tHeterocyclic Compounds\t\n"));
    }

    #[test]
    fn writes_broader_term_edges() {
        let (result, out) = convert(SAMPLE);
        let stats = result.unwrap();

        let edges = fs::read_to_string(&out.edges).unwrap();
        let lines: Vec<&str> = edges.lines().collect();
        assert!(lines.contains(&"D000001\tD011714\thas_broader_term"));
        assert!(lines.contains(&"D011714\tD006574\thas_broader_term"));
        assert!(lines.contains(&"D006574\tD006571\thas_broader_term"));
        // D03.633.100 -> D03.633 is a self edge of D006574
        assert!(lines.contains(&"D006574\tD006574\thas_broader_term"));
        assert_eq!(stats.edges, lines.len() as u64);
    }

    #[test]
    fn qualifier_and_supplementary_records() {
        let input = "\
*NEWRECORD
RECTYPE = Q
SH = abnormalities
MS = Used with organs for congenital defects.
UI = Q000002
*NEWRECORD
RECTYPE = C
NM = 1,2-dihydroxybenzene
UI = C000001
";
        let (result, out) = convert(input);
        assert_eq!(result.unwrap().nodes, 2);
        let nodes = fs::read_to_string(&out.nodes).unwrap();
        assert_eq!(
            nodes,
            "Q000002\tabnormalities\tUsed with organs for congenital defects.\n\
             C000001\t1,2-dihydroxybenzene\t1,2-dihydroxybenzene\n"
        );
    }

    #[test]
    fn name_keys_follow_record_type() {
        let input = "*NEWRECORD\nRECTYPE = Q\nMH = wrong key\nUI = Q000003\n";
        let (result, out) = convert(input);
        result.unwrap();
        assert_eq!(fs::read_to_string(&out.nodes).unwrap(), "Q000003\t\t\n");
    }

    #[test]
    fn tabs_in_scope_note_become_spaces() {
        let input = "*NEWRECORD\nRECTYPE = D\nMH = X\nMS = a\tb\nUI = D1\n";
        let (result, out) = convert(input);
        result.unwrap();
        assert_eq!(fs::read_to_string(&out.nodes).unwrap(), "D1\tX\ta b\n");
    }

    #[test]
    fn unknown_parent_tree_number_is_an_error() {
        let input = "*NEWRECORD\nRECTYPE = D\nMH = Orphan\nMN = Z01.100\nUI = D9\n";
        let (result, _out) = convert(input);
        match result {
            Err(IngestError::UnknownTreeNumber { tree_number, ui }) => {
                assert_eq!(tree_number, "Z01");
                assert_eq!(ui, "D9");
            }
            other => panic!("expected UnknownTreeNumber, got {:?}", other.map(|s| s.nodes)),
        }
    }

    #[test]
    fn read_error_names_the_file() {
        let (result, _out) = convert_bytes(b"*NEWRECORD\nMH = \xff\xfe\n");
        match result {
            Err(IngestError::Io { path, .. }) => assert_eq!(path, PathBuf::from("d2017.bin")),
            other => panic!("expected I/O error, got {:?}", other.map(|s| s.nodes)),
        }
    }

    #[test]
    fn record_without_ui_is_dropped() {
        let input = "*NEWRECORD\nRECTYPE = D\nMH = Nameless\n*NEWRECORD\nRECTYPE = D\nMH = Kept\nUI = D2\n";
        let (result, out) = convert(input);
        assert_eq!(result.unwrap().nodes, 1);
        assert_eq!(fs::read_to_string(&out.nodes).unwrap(), "D2\tKept\t\n");
    }
}
