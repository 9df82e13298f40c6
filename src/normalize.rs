//! Derives the node row and MeSH edges of one citation.
//!
//! The formatting rules here define the output files byte for byte; downstream
//! loaders depend on them, so changes must be deliberate.

use crate::models::{AnnotationKind, DataQualityFault, EdgeRow, NodeRow, RawCitation};
use memchr::memchr3;

pub const HAS_TOPIC: &str = "has_topic";
pub const HAS_TOPIC_QUALIFIER: &str = "has_topic_qualifier";
pub const HAS_MAJOR_TOPIC_QUALIFIER: &str = "has_major_topic_qualifier";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Rewrite years below 100 as `20yy`
    pub expand_two_digit_years: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            expand_two_digit_years: true,
        }
    }
}

#[derive(Debug)]
pub struct NormalizedCitation {
    pub node: NodeRow,
    pub edges: Vec<EdgeRow>,
    pub faults: Vec<DataQualityFault>,
}

pub fn normalize(citation: &RawCitation, options: &NormalizeOptions) -> NormalizedCitation {
    let id = itoa::Buffer::new().format(citation.pmid).to_string();

    let title = sanitize_field(&citation.title);
    let journal_abbr = sanitize_field(&citation.journal_abbr);
    let date = publication_date(citation, options);

    let description = format!(
        "{}{}. {}. ({})",
        author_prefix(&citation.authors),
        title,
        journal_abbr,
        date
    );

    let (edges, faults) = topic_edges(&id, citation);

    NormalizedCitation {
        node: NodeRow {
            id,
            label: title,
            description,
        },
        edges,
        faults,
    }
}

/// `"Smith. "`, `"Smith et al. "` or empty.
pub fn author_prefix(authors: &[String]) -> String {
    match authors {
        [] => String::new(),
        [only] => format!("{only}. "),
        [first, ..] => format!("{first} et al. "),
    }
}

/// Month and year joined by a space, trimmed.
pub fn publication_date(citation: &RawCitation, options: &NormalizeOptions) -> String {
    let month = if citation.pub_month.is_empty() {
        month_name(citation.alt_pub_month)
    } else {
        citation.pub_month.clone()
    };

    let year = if citation.pub_year > 0 {
        citation.pub_year
    } else {
        citation.alt_pub_year
    };
    let year = if options.expand_two_digit_years && year < 100 {
        format!("20{year}")
    } else {
        year.to_string()
    };

    format!("{month} {year}").trim().to_string()
}

/// Full English name of a 1-based month. Out-of-range values (including an
/// absent month, 0) render as `%!Month(n)`, matching historical output files.
pub fn month_name(month: i32) -> String {
    match usize::try_from(month) {
        Ok(m @ 1..=12) => MONTH_NAMES[m - 1].to_string(),
        _ => format!("%!Month({month})"),
    }
}

/// Tabs and line breaks become spaces; trailing dots and spaces are dropped.
pub fn sanitize_field(value: &str) -> String {
    let cleaned = if memchr3(b'\t', b'\n', b'\r', value.as_bytes()).is_some() {
        value.replace(['\t', '\n', '\r'], " ")
    } else {
        value.to_string()
    };
    cleaned.trim_end_matches(['.', ' ']).to_string()
}

/// The descriptor is the target of `has_topic`; for qualifiers the qualifier is
/// the target and the descriptor the context, so a topic can be queried alone or
/// together with a qualifier.
fn topic_edges(id: &str, citation: &RawCitation) -> (Vec<EdgeRow>, Vec<DataQualityFault>) {
    let mut edges = Vec::new();
    let mut faults = Vec::new();

    for heading in &citation.mesh_headings {
        if heading.ui.is_empty() {
            faults.push(DataQualityFault {
                pmid: citation.pmid,
                kind: AnnotationKind::Descriptor,
                name: heading.name.clone(),
            });
            continue;
        }

        let (context, qualifier_relation) = if heading.is_major() {
            ("major", HAS_MAJOR_TOPIC_QUALIFIER)
        } else {
            ("minor", HAS_TOPIC_QUALIFIER)
        };
        edges.push(EdgeRow::new(id, &heading.ui, HAS_TOPIC).with_context(context));

        for qualifier in &heading.qualifiers {
            if qualifier.ui.is_empty() {
                faults.push(DataQualityFault {
                    pmid: citation.pmid,
                    kind: AnnotationKind::Qualifier,
                    name: qualifier.name.clone(),
                });
                continue;
            }
            edges.push(
                EdgeRow::new(id, &qualifier.ui, qualifier_relation).with_context(&heading.ui),
            );
        }
    }

    (edges, faults)
}
