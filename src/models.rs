use serde::Serialize;
use std::fmt;

/// One MEDLINE citation as decoded from a snapshot. Only `pmid` is required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCitation {
    pub pmid: u64,
    /// `Article/Journal/JournalIssue/PubDate/Year`
    pub pub_year: i32,
    /// `Article/Journal/JournalIssue/PubDate/Month`, free text ("Mar", "03", ...)
    pub pub_month: String,
    /// `DateCreated/Year`
    pub alt_pub_year: i32,
    /// `DateCreated/Month`
    pub alt_pub_month: i32,
    pub journal: String,
    pub journal_abbr: String,
    pub title: String,
    /// Author surnames in document order
    pub authors: Vec<String>,
    pub mesh_headings: Vec<MeshHeading>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshHeading {
    pub ui: String,
    pub name: String,
    /// Raw `MajorTopicYN` attribute value
    pub major_topic: String,
    pub qualifiers: Vec<MeshQualifier>,
}

impl MeshHeading {
    pub fn is_major(&self) -> bool {
        self.major_topic == "Y"
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshQualifier {
    pub ui: String,
    pub name: String,
}

/// Everything extracted from one snapshot document.
#[derive(Debug, Default)]
pub struct DecodedSnapshot {
    pub citations: Vec<RawCitation>,
    pub deleted: Vec<u64>,
}

/// `(id, label, description)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRow {
    pub id: String,
    pub label: String,
    pub description: String,
}

/// `(subject, object, relation, context)`; context-less edges are written as 3 columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRow {
    pub subject: String,
    pub object: String,
    pub relation: String,
    pub context: Option<String>,
}

impl EdgeRow {
    pub fn new(subject: &str, object: &str, relation: &str) -> Self {
        Self {
            subject: subject.to_string(),
            object: object.to_string(),
            relation: relation.to_string(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Descriptor,
    Qualifier,
}

/// A MeSH annotation dropped because it has no UI. The citation itself is still emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataQualityFault {
    pub pmid: u64,
    pub kind: AnnotationKind,
    pub name: String,
}

impl fmt::Display for DataQualityFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            AnnotationKind::Descriptor => "descriptor",
            AnnotationKind::Qualifier => "qualifier",
        };
        write!(
            f,
            "no UI for MeSH {kind} '{}' in PMID {}",
            self.name, self.pmid
        )
    }
}
