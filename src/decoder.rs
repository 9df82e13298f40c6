//! MEDLINE/PubMed snapshot decoder.
//!
//! Hand-written descent over `quick-xml` events. Each `decode_*` function is
//! entered right after the opening tag of its element and returns after the
//! matching closing tag. Children that are not extracted are skipped whole, so
//! identifiers nested elsewhere (e.g. `CommentsCorrections/PMID`) never leak
//! into the citation.
//!
//! Extracted paths, relative to `PubmedArticle/MedlineCitation`:
//!
//! | field            | path                                          |
//! |------------------|-----------------------------------------------|
//! | `pmid`           | `PMID`                                        |
//! | `pub_year`       | `Article/Journal/JournalIssue/PubDate/Year`   |
//! | `pub_month`      | `Article/Journal/JournalIssue/PubDate/Month`  |
//! | `alt_pub_year`   | `DateCreated/Year`                            |
//! | `alt_pub_month`  | `DateCreated/Month`                           |
//! | `journal`        | `Article/Journal/Title`                       |
//! | `journal_abbr`   | `Article/Journal/ISOAbbreviation`             |
//! | `title`          | `Article/ArticleTitle`                        |
//! | `authors`        | `Article/AuthorList/Author/LastName`          |
//! | `mesh_headings`  | `MeshHeadingList/MeshHeading`                 |
//!
//! Deletions are read from `DeleteCitation/PMID` under the document root.

use crate::error::{IngestError, Result};
use crate::models::{DecodedSnapshot, MeshHeading, MeshQualifier, RawCitation};
use memchr::memchr;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use tracing::debug;

/// Decodes one whole snapshot document into memory.
pub fn decode_snapshot<R: BufRead>(input: R) -> Result<DecodedSnapshot> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut snapshot = DecodedSnapshot::default();
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if !seen_root => {
                seen_root = true;
                decode_root(&mut reader, e.name().as_ref(), &mut snapshot)?;
            }
            Event::Empty(_) if !seen_root => seen_root = true,
            Event::Start(e) | Event::Empty(e) => {
                return Err(IngestError::Malformed(format!(
                    "second root element <{}>",
                    String::from_utf8_lossy(e.name().as_ref())
                )));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(IngestError::Malformed(
            "document has no root element".to_string(),
        ));
    }

    debug!(
        citations = snapshot.citations.len(),
        deleted = snapshot.deleted.len(),
        "Snapshot decoded"
    );
    Ok(snapshot)
}

fn decode_root<R: BufRead>(
    reader: &mut Reader<R>,
    root: &[u8],
    snapshot: &mut DecodedSnapshot,
) -> Result<()> {
    for_each_child(reader, root, |reader, e, empty| {
        if empty {
            return Ok(false);
        }
        match e.name().as_ref() {
            b"PubmedArticle" => {
                decode_article(reader, snapshot)?;
                Ok(true)
            }
            // legacy MedlineCitationSet layout
            b"MedlineCitation" => {
                let position = snapshot.citations.len() + 1;
                snapshot.citations.push(decode_citation(reader, position)?);
                Ok(true)
            }
            b"DeleteCitation" => {
                decode_deletions(reader, &mut snapshot.deleted)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    })
}

fn decode_article<R: BufRead>(reader: &mut Reader<R>, snapshot: &mut DecodedSnapshot) -> Result<()> {
    for_each_child(reader, b"PubmedArticle", |reader, e, empty| {
        if !empty && e.name().as_ref() == b"MedlineCitation" {
            let position = snapshot.citations.len() + 1;
            snapshot.citations.push(decode_citation(reader, position)?);
            return Ok(true);
        }
        Ok(false)
    })
}

fn decode_deletions<R: BufRead>(reader: &mut Reader<R>, deleted: &mut Vec<u64>) -> Result<()> {
    for_each_child(reader, b"DeleteCitation", |reader, e, empty| {
        if !empty && e.name().as_ref() == b"PMID" {
            if let Some(pmid) = read_u64(reader, "PMID")? {
                deleted.push(pmid);
            }
            return Ok(true);
        }
        Ok(false)
    })
}

fn decode_citation<R: BufRead>(reader: &mut Reader<R>, position: usize) -> Result<RawCitation> {
    let mut citation = RawCitation::default();
    let mut pmid = None;

    for_each_child(reader, b"MedlineCitation", |reader, e, empty| {
        if empty {
            return Ok(false);
        }
        match e.name().as_ref() {
            b"PMID" => pmid = read_u64(reader, "PMID")?,
            b"DateCreated" => decode_date_created(reader, &mut citation)?,
            b"Article" => decode_article_body(reader, &mut citation)?,
            b"MeshHeadingList" => citation.mesh_headings = decode_mesh_list(reader)?,
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    citation.pmid = pmid.ok_or(IngestError::MissingPmid { position })?;
    Ok(citation)
}

fn decode_date_created<R: BufRead>(reader: &mut Reader<R>, citation: &mut RawCitation) -> Result<()> {
    for_each_child(reader, b"DateCreated", |reader, e, empty| {
        if empty {
            return Ok(false);
        }
        match e.name().as_ref() {
            b"Year" => citation.alt_pub_year = read_i32(reader, "Year")?,
            b"Month" => citation.alt_pub_month = read_i32(reader, "Month")?,
            _ => return Ok(false),
        }
        Ok(true)
    })
}

fn decode_article_body<R: BufRead>(reader: &mut Reader<R>, citation: &mut RawCitation) -> Result<()> {
    for_each_child(reader, b"Article", |reader, e, empty| {
        if empty {
            return Ok(false);
        }
        match e.name().as_ref() {
            b"Journal" => decode_journal(reader, citation)?,
            b"ArticleTitle" => citation.title = read_text(reader, b"ArticleTitle")?,
            b"AuthorList" => citation.authors = decode_authors(reader)?,
            _ => return Ok(false),
        }
        Ok(true)
    })
}

fn decode_journal<R: BufRead>(reader: &mut Reader<R>, citation: &mut RawCitation) -> Result<()> {
    for_each_child(reader, b"Journal", |reader, e, empty| {
        if empty {
            return Ok(false);
        }
        match e.name().as_ref() {
            b"Title" => citation.journal = read_text(reader, b"Title")?,
            b"ISOAbbreviation" => citation.journal_abbr = read_text(reader, b"ISOAbbreviation")?,
            b"JournalIssue" => decode_journal_issue(reader, citation)?,
            _ => return Ok(false),
        }
        Ok(true)
    })
}

fn decode_journal_issue<R: BufRead>(reader: &mut Reader<R>, citation: &mut RawCitation) -> Result<()> {
    for_each_child(reader, b"JournalIssue", |reader, e, empty| {
        if !empty && e.name().as_ref() == b"PubDate" {
            decode_pub_date(reader, citation)?;
            return Ok(true);
        }
        Ok(false)
    })
}

fn decode_pub_date<R: BufRead>(reader: &mut Reader<R>, citation: &mut RawCitation) -> Result<()> {
    // MedlineDate ("1998 Dec-1999 Jan") is not interpreted
    for_each_child(reader, b"PubDate", |reader, e, empty| {
        if empty {
            return Ok(false);
        }
        match e.name().as_ref() {
            b"Year" => citation.pub_year = read_i32(reader, "Year")?,
            b"Month" => citation.pub_month = read_text(reader, b"Month")?,
            _ => return Ok(false),
        }
        Ok(true)
    })
}

fn decode_authors<R: BufRead>(reader: &mut Reader<R>) -> Result<Vec<String>> {
    let mut authors = Vec::new();
    for_each_child(reader, b"AuthorList", |reader, e, empty| {
        if empty || e.name().as_ref() != b"Author" {
            return Ok(false);
        }
        // CollectiveName-only authors have no surname and are left out
        let mut last_name = None;
        for_each_child(reader, b"Author", |reader, e, empty| {
            if !empty && e.name().as_ref() == b"LastName" {
                last_name = Some(read_text(reader, b"LastName")?);
                return Ok(true);
            }
            Ok(false)
        })?;
        authors.extend(last_name);
        Ok(true)
    })?;
    Ok(authors)
}

fn decode_mesh_list<R: BufRead>(reader: &mut Reader<R>) -> Result<Vec<MeshHeading>> {
    let mut headings = Vec::new();
    for_each_child(reader, b"MeshHeadingList", |reader, e, empty| {
        if empty || e.name().as_ref() != b"MeshHeading" {
            return Ok(false);
        }
        headings.push(decode_mesh_heading(reader)?);
        Ok(true)
    })?;
    Ok(headings)
}

fn decode_mesh_heading<R: BufRead>(reader: &mut Reader<R>) -> Result<MeshHeading> {
    let mut heading = MeshHeading::default();
    for_each_child(reader, b"MeshHeading", |reader, e, empty| {
        match e.name().as_ref() {
            b"DescriptorName" => {
                heading.ui = attribute(e, b"UI")?;
                heading.major_topic = attribute(e, b"MajorTopicYN")?;
                if !empty {
                    heading.name = read_text(reader, b"DescriptorName")?;
                }
            }
            b"QualifierName" => {
                let mut qualifier = MeshQualifier {
                    ui: attribute(e, b"UI")?,
                    name: String::new(),
                };
                if !empty {
                    qualifier.name = read_text(reader, b"QualifierName")?;
                }
                heading.qualifiers.push(qualifier);
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(heading)
}

/// Visits each child element of the element just opened, up to its closing tag.
///
/// `visit` gets the child's start tag and whether it is self-closing, and returns
/// `true` if it consumed the child's body. Bodies left unconsumed are skipped.
fn for_each_child<R, F>(reader: &mut Reader<R>, parent: &[u8], mut visit: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(&mut Reader<R>, &BytesStart<'_>, bool) -> Result<bool>,
{
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if !visit(reader, &e, false)? {
                    skip_element(reader, e.name().as_ref())?;
                }
            }
            Event::Empty(e) => {
                visit(reader, &e, true)?;
            }
            Event::End(_) => return Ok(()),
            Event::Eof => return Err(truncated(parent)),
            _ => {}
        }
        buf.clear();
    }
}

fn skip_element<R: BufRead>(reader: &mut Reader<R>, name: &[u8]) -> Result<()> {
    let mut buf = Vec::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(()),
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(truncated(name)),
            _ => {}
        }
        buf.clear();
    }
}

/// All character data inside the element, inline markup (`<i>`, `<sup>`, ...) included.
fn read_text<R: BufRead>(reader: &mut Reader<R>, name: &[u8]) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&normalize_line_endings(&e.unescape()?)),
            Event::CData(e) => {
                text.push_str(&normalize_line_endings(&String::from_utf8_lossy(&e)))
            }
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(text),
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(truncated(name)),
            _ => {}
        }
        buf.clear();
    }
}

/// XML end-of-line handling: `\r\n` and a lone `\r` both read as `\n`.
fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if memchr(b'\r', text.as_bytes()).is_none() {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

fn read_i32<R: BufRead>(reader: &mut Reader<R>, field: &'static str) -> Result<i32> {
    let text = read_text(reader, field.as_bytes())?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed.parse().map_err(|_| IngestError::InvalidNumber {
        field,
        value: text.clone(),
    })
}

/// Empty text counts as absent.
fn read_u64<R: BufRead>(reader: &mut Reader<R>, field: &'static str) -> Result<Option<u64>> {
    let text = read_text(reader, field.as_bytes())?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| IngestError::InvalidNumber {
            field,
            value: text.clone(),
        })
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return Ok(attr.unescape_value()?.into_owned());
        }
    }
    Ok(String::new())
}

fn truncated(name: &[u8]) -> IngestError {
    IngestError::Malformed(format!(
        "unexpected end of document inside <{}>",
        String::from_utf8_lossy(name)
    ))
}
