//! OBO flat-file ontologies (GO, HPO, ...) to graph rows.
//!
//! Only `[Term]` stanzas are converted. `is_a` and `relationship` tags become
//! edges in the order they appear; obsolete terms are dropped with their edges.

use crate::emitter::GraphEmitter;
use crate::error::{IngestError, Result};
use crate::models::{EdgeRow, NodeRow};
use crate::stats::ConvertStats;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

pub const IS_A: &str = "is_a";

const TERM_STANZA: &str = "[Term]";

/// `part_of GO:0005634 {source="x"} ! nucleus` -> (`part_of`, `GO:0005634`)
static RELATIONSHIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)\s+([^\s!{]+)").expect("valid relationship regex"));

#[derive(Default)]
struct Stanza {
    is_term: bool,
    id: String,
    name: String,
    def: String,
    obsolete: bool,
    edges: Vec<(String, String)>,
}

impl Stanza {
    fn apply(&mut self, line_no: usize, tag: &str, value: &str) -> Result<()> {
        match tag {
            "id" => self.id = value.to_string(),
            "name" => self.name = unquote(value),
            "def" => self.def = unquote(value),
            "is_a" => {
                if let Some(target) = first_token(value) {
                    self.edges.push((target.to_string(), IS_A.to_string()));
                }
            }
            "relationship" => {
                let caps = RELATIONSHIP.captures(value).ok_or_else(|| IngestError::Obo {
                    line: line_no,
                    message: format!("relationship without target: {value:?}"),
                })?;
                self.edges.push((caps[2].to_string(), caps[1].to_string()));
            }
            "is_obsolete" => self.obsolete = value == "true",
            _ => {}
        }
        Ok(())
    }
}

/// Converts one OBO file read from `input`; `path` names it in errors.
pub fn convert_obo<R: BufRead>(
    input: R,
    path: &Path,
    emitter: &mut GraphEmitter,
) -> Result<ConvertStats> {
    let mut stanza = Stanza::default();
    let mut stats = ConvertStats::default();
    let mut obsolete = 0u64;

    for (i, line) in input.lines().enumerate() {
        let line_no = i + 1;
        let line = line.map_err(|e| IngestError::io(path, e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('!') {
            continue;
        }

        if line.starts_with('[') {
            if flush_stanza(&mut stanza, emitter, &mut stats)? {
                obsolete += 1;
            }
            stanza.is_term = line == TERM_STANZA;
            continue;
        }

        let (tag, value) = line.split_once(": ").ok_or_else(|| IngestError::Obo {
            line: line_no,
            message: format!("expected `tag: value`, found {line:?}"),
        })?;
        stanza.apply(line_no, tag.trim(), value.trim())?;
    }
    if flush_stanza(&mut stanza, emitter, &mut stats)? {
        obsolete += 1;
    }

    info!(
        nodes = stats.nodes,
        edges = stats.edges,
        obsolete,
        "OBO conversion complete"
    );
    Ok(stats)
}

/// Emits the finished stanza. Returns true when a term was dropped as obsolete.
fn flush_stanza(
    stanza: &mut Stanza,
    emitter: &mut GraphEmitter,
    stats: &mut ConvertStats,
) -> Result<bool> {
    let stanza = std::mem::take(stanza);
    if !stanza.is_term || stanza.id.is_empty() {
        return Ok(false);
    }
    if stanza.obsolete {
        debug!(id = %stanza.id, "Dropping obsolete term");
        return Ok(true);
    }

    emitter.write_node(&NodeRow {
        id: stanza.id.clone(),
        label: stanza.name,
        description: stanza.def,
    })?;
    stats.nodes += 1;

    for (target, relation) in &stanza.edges {
        emitter.write_edge(&EdgeRow::new(&stanza.id, target, relation))?;
        stats.edges += 1;
    }
    Ok(false)
}

fn first_token(value: &str) -> Option<&str> {
    value
        .split_whitespace()
        .next()
        .filter(|token| !token.starts_with('!'))
}

/// Strips OBO double quotes and trims the quoted body. Only `\"` is resolved;
/// other backslash sequences are kept verbatim. Text after the closing quote
/// (dbxrefs, modifiers) is dropped; an unterminated quote keeps the rest.
fn unquote(value: &str) -> String {
    let Some(body) = value.strip_prefix('"') else {
        return value.replace('\t', " ");
    };

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => {
                chars.next();
                out.push('"');
            }
            '"' => break,
            '\t' => out.push(' '),
            _ => out.push(c),
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"format-version: 1.2
ontology: go
! generated file

[Term]
id: GO:0000001
name: mitochondrion inheritance
def: "The distribution of \"mitochondria\" into daughter cells." [GOC:mcc, PMID:10873824]
is_a: GO:0048308 ! organelle inheritance
relationship: part_of GO:0005634 {source="x"} ! nucleus

[Term]
id: GO:0000005
name: obsolete ribosomal chaperone activity
is_a: GO:0000001
is_obsolete: true

[Typedef]
id: part_of
name: part of

[Term]
id: GO:0000006
name: high-affinity zinc transporter activity
"#;

    fn convert(input: &str) -> (Result<ConvertStats>, TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let nodes = dir.path().join("nodes.txt");
        let edges = dir.path().join("edges.txt");
        let mut emitter = GraphEmitter::create(&nodes, &edges).unwrap();
        let result = convert_obo(input.as_bytes(), Path::new("go.obo"), &mut emitter);
        emitter.finish().unwrap();
        (result, dir, nodes, edges)
    }

    #[test]
    fn converts_terms() {
        let (result, _dir, nodes, edges) = convert(SAMPLE);
        let stats = result.unwrap();
        assert_eq!(stats, ConvertStats { nodes: 2, edges: 2 });

        assert_eq!(
            fs::read_to_string(nodes).unwrap(),
            "GO:0000001\tmitochondrion inheritance\tThe distribution of \"mitochondria\" into daughter cells.\n\
             GO:0000006\thigh-affinity zinc transporter activity\t\n"
        );
        assert_eq!(
            fs::read_to_string(edges).unwrap(),
            "GO:0000001\tGO:0048308\tis_a\nGO:0000001\tGO:0005634\tpart_of\n"
        );
    }

    #[test]
    fn line_without_tag_is_an_error() {
        let input = "[Term]\nid: X:1\nthis is not a tag line\n";
        let (result, ..) = convert(input);
        match result {
            Err(IngestError::Obo { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected OBO error, got {:?}", other.map(|s| s.nodes)),
        }
    }

    #[test]
    fn read_error_names_the_file() {
        let dir = TempDir::new().unwrap();
        let mut emitter =
            GraphEmitter::create(&dir.path().join("n.txt"), &dir.path().join("e.txt")).unwrap();
        let result = convert_obo(&b"[Term]\nid: \xff\n"[..], Path::new("go.obo"), &mut emitter);
        assert!(
            matches!(result, Err(IngestError::Io { ref path, .. }) if path == Path::new("go.obo"))
        );
    }

    #[test]
    fn relationship_without_target_is_an_error() {
        let input = "[Term]\nid: X:1\nrelationship: part_of\n";
        let (result, ..) = convert(input);
        assert!(matches!(result, Err(IngestError::Obo { line: 3, .. })));
    }

    #[test]
    fn unquote_variants() {
        assert_eq!(unquote("plain\tname"), "plain name");
        assert_eq!(unquote(r#""quoted" [ref:1]"#), "quoted");
        assert_eq!(unquote(r#""say \"hi\"""#), "say \"hi\"");
        assert_eq!(unquote("\"unterminated\trest"), "unterminated rest");
    }

    #[test]
    fn unquote_keeps_other_escapes_and_trims() {
        assert_eq!(unquote(r#"" padded ""#), "padded");
        assert_eq!(unquote(r#""a\nb" []"#), r"a\nb");
    }

    #[test]
    fn quoted_values_are_written_raw() {
        let input = "[Term]\nid: X:1\nname: \" padded \"\ndef: \"a\\nb\" []\n";
        let (result, _dir, nodes, _) = convert(input);
        result.unwrap();
        assert_eq!(fs::read_to_string(nodes).unwrap(), "X:1\tpadded\ta\\nb\n");
    }

    #[test]
    fn obsolete_term_drops_its_edges() {
        let (result, _dir, nodes, edges) = convert(SAMPLE);
        result.unwrap();
        assert!(!fs::read_to_string(nodes).unwrap().contains("GO:0000005"));
        let edges = fs::read_to_string(edges).unwrap();
        assert!(!edges.contains("GO:0000005\tGO:0000001\tis_a"));
    }

    #[test]
    fn obsolete_false_keeps_term() {
        let input = "[Term]\nid: X:1\nname: kept\nis_obsolete: false\n";
        let (result, _dir, nodes, _) = convert(input);
        assert_eq!(result.unwrap().nodes, 1);
        assert_eq!(fs::read_to_string(nodes).unwrap(), "X:1\tkept\t\n");
    }
}
